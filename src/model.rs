pub mod order;
pub mod product;
pub mod user;

pub use order::{Order, OrderDraft, ProductRef, UserRef};
pub use product::{Product, ProductDraft};
pub use user::{User, UserDraft};

use chrono::NaiveDate;

/// 记录ID，由后端分配
pub type RecordId = i64;

/// 列表控制器可管理的记录
pub trait Record: Clone {
    /// 唯一标识
    fn id(&self) -> RecordId;

    /// 参与搜索的文本字段
    fn search_fields(&self) -> Vec<&str>;

    /// 排序使用的日期（用户为注册日期，订单为下单日期）
    fn record_date(&self) -> Option<NaiveDate> {
        None
    }
}

/// 日期在接口中以 `YYYY-MM-DD` 传输，读取时兼容带时间的格式
pub(crate) mod wire_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
        // "2024-03-01T00:00:00.000+00:00" 之类只取日期部分
        let day = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(day, FORMAT)
    }

    pub mod option {
        use chrono::NaiveDate;
        use serde::Serializer;

        pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match date {
                Some(date) => super::serialize(date, serializer),
                None => serializer.serialize_none(),
            }
        }
    }
}
