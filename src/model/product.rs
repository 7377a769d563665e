use serde::{Deserialize, Serialize};

use super::{Record, RecordId};

/// 产品，订单表单的参考数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "idproducto")]
    pub id: RecordId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "moneda", default)]
    pub currency: String,
    #[serde(rename = "estatus", default)]
    pub status: i32,
}

impl Record for Product {
    fn id(&self) -> RecordId {
        self.id
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.category.as_str()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDraft {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "moneda")]
    pub currency: String,
    #[serde(rename = "estatus")]
    pub status: i32,
}
