use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Product, Record, RecordId, User, wire_date};

/// 采购订单
///
/// 后端返回的订单内嵌了完整的用户与产品，仅用于展示。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "idorden")]
    pub id: RecordId,
    #[serde(rename = "usuario", default)]
    pub user: Option<User>,
    #[serde(rename = "producto", default)]
    pub product: Option<Product>,
    #[serde(rename = "cantidad")]
    pub quantity: i64,
    #[serde(rename = "preciounitario")]
    pub unit_price: f64,
    #[serde(rename = "fecha", with = "wire_date")]
    pub date: NaiveDate,
}

impl Order {
    /// 行合计 = 数量 × 单价
    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }

    pub fn category(&self) -> Option<&str> {
        self.product.as_ref().map(|p| p.category.as_str())
    }
}

impl Record for Order {
    fn id(&self) -> RecordId {
        self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        let mut fields = Vec::with_capacity(4);
        if let Some(user) = &self.user {
            fields.push(user.first_name.as_str());
            fields.push(user.last_name.as_str());
        }
        if let Some(product) = &self.product {
            fields.push(product.name.as_str());
            fields.push(product.category.as_str());
        }
        fields
    }

    fn record_date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

/// 用户引用 `{"idusuario": n}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UserRef {
    #[serde(rename = "idusuario")]
    pub id: RecordId,
}

/// 产品引用 `{"idproducto": n}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProductRef {
    #[serde(rename = "idproducto")]
    pub id: RecordId,
}

/// 创建订单的请求体，用户和产品以引用对象嵌套
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDraft {
    #[serde(rename = "usuario")]
    pub user: UserRef,
    #[serde(rename = "producto")]
    pub product: ProductRef,
    #[serde(rename = "cantidad")]
    pub quantity: i64,
    #[serde(rename = "preciounitario")]
    pub unit_price: f64,
    #[serde(rename = "fecha", with = "wire_date")]
    pub date: NaiveDate,
}
