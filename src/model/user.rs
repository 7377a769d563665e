use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Record, RecordId, wire_date};

/// 用户记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "idusuario")]
    pub id: RecordId,
    #[serde(rename = "nombre")]
    pub first_name: String,
    /// 父姓
    #[serde(rename = "paterno")]
    pub last_name: String,
    /// 母姓
    #[serde(rename = "materno", default)]
    pub second_last_name: String,
    #[serde(rename = "correo")]
    pub email: String,
    /// 1 = 活跃, 0 = 停用
    #[serde(rename = "estatus")]
    pub status: i32,
    #[serde(rename = "fecharegistro", with = "wire_date")]
    pub registered_on: NaiveDate,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == 1
    }

    /// 全名：名 + 父姓 + 母姓
    pub fn full_name(&self) -> String {
        [
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.second_last_name.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

impl Record for User {
    fn id(&self) -> RecordId {
        self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.first_name.as_str(),
            self.last_name.as_str(),
            self.second_last_name.as_str(),
            self.email.as_str(),
        ]
    }

    fn record_date(&self) -> Option<NaiveDate> {
        Some(self.registered_on)
    }
}

/// 创建或更新用户时提交的数据（不含ID）
///
/// 创建时由客户端填入当天日期作为注册日期；更新时不发送该字段。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserDraft {
    #[serde(rename = "nombre")]
    pub first_name: String,
    #[serde(rename = "paterno")]
    pub last_name: String,
    #[serde(rename = "materno")]
    pub second_last_name: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "estatus")]
    pub status: i32,
    #[serde(
        rename = "fecharegistro",
        with = "wire_date::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub registered_on: Option<NaiveDate>,
}
