use std::fmt;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{OrderDraft, Product, ProductRef, RecordId, User, UserDraft, UserRef};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("邮箱正则表达式无效")
});

/// 单个字段的校验错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// 按字段顺序收集的校验错误
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// 指定字段的第一条错误
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.errors.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

/// 表单 - 提交前校验输入并生成请求数据
pub trait Form {
    type Draft;

    fn validate(&self) -> Result<Self::Draft, FieldErrors>;
}

/// 用户表单
#[derive(Debug, Clone, PartialEq)]
pub struct UserForm {
    pub first_name: String,
    pub last_name: String,
    pub second_last_name: String,
    pub email: String,
    pub active: bool,
    /// 创建时填入当天日期，编辑时为 None
    pub registered_on: Option<NaiveDate>,
}

impl Default for UserForm {
    fn default() -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            second_last_name: String::new(),
            email: String::new(),
            active: true,
            registered_on: None,
        }
    }
}

impl UserForm {
    /// 以现有用户预填编辑表单
    pub fn from_user(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            second_last_name: user.second_last_name.clone(),
            email: user.email.clone(),
            active: user.is_active(),
            registered_on: None,
        }
    }
}

fn require(errors: &mut FieldErrors, field: &'static str, value: &str, message: &str) -> bool {
    if value.trim().is_empty() {
        errors.push(field, message);
        false
    } else {
        true
    }
}

impl Form for UserForm {
    type Draft = UserDraft;

    fn validate(&self) -> Result<UserDraft, FieldErrors> {
        let mut errors = FieldErrors::new();

        require(&mut errors, "first_name", &self.first_name, "名字为必填项");
        require(&mut errors, "last_name", &self.last_name, "父姓为必填项");
        require(
            &mut errors,
            "second_last_name",
            &self.second_last_name,
            "母姓为必填项",
        );
        if require(&mut errors, "email", &self.email, "邮箱为必填项")
            && !EMAIL_RE.is_match(self.email.trim())
        {
            errors.push("email", "邮箱格式无效");
        }

        errors.finish(|| UserDraft {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            second_last_name: self.second_last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            status: if self.active { 1 } else { 0 },
            registered_on: self.registered_on,
        })
    }
}

/// 订单表单，字段保留用户输入的原始文本
///
/// 所选用户和产品必须存在于本地已加载的参考列表中。
#[derive(Debug, Clone)]
pub struct OrderForm<'a> {
    pub user_id: &'a str,
    pub product_id: &'a str,
    pub quantity: &'a str,
    pub unit_price: &'a str,
    pub date: NaiveDate,
    pub users: &'a [User],
    pub products: &'a [Product],
}

fn parse_reference(
    errors: &mut FieldErrors,
    field: &'static str,
    raw: &str,
    missing: &str,
) -> Option<RecordId> {
    if raw.trim().is_empty() {
        errors.push(field, missing);
        return None;
    }
    match raw.trim().parse::<RecordId>() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.push(field, format!("无效的ID: {}", raw.trim()));
            None
        }
    }
}

impl Form for OrderForm<'_> {
    type Draft = OrderDraft;

    fn validate(&self) -> Result<OrderDraft, FieldErrors> {
        let mut errors = FieldErrors::new();

        let user_id = parse_reference(&mut errors, "user", self.user_id, "必须选择用户");
        let product_id = parse_reference(&mut errors, "product", self.product_id, "必须选择产品");

        if let Some(id) = user_id {
            if !self.users.iter().any(|u| u.id == id) {
                errors.push("user", format!("用户 {} 不存在", id));
            }
        }
        if let Some(id) = product_id {
            if !self.products.iter().any(|p| p.id == id) {
                errors.push("product", format!("产品 {} 不存在", id));
            }
        }

        let quantity = if require(&mut errors, "quantity", self.quantity, "数量为必填项") {
            match self.quantity.trim().parse::<i64>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    errors.push("quantity", "数量必须是大于 0 的整数");
                    None
                }
            }
        } else {
            None
        };

        let unit_price = if require(&mut errors, "unit_price", self.unit_price, "单价为必填项") {
            match self.unit_price.trim().parse::<f64>() {
                Ok(p) if p.is_finite() && p > 0.0 => Some(p),
                _ => {
                    errors.push("unit_price", "单价必须是大于 0 的数字");
                    None
                }
            }
        } else {
            None
        };

        match (user_id, product_id, quantity, unit_price) {
            (Some(user), Some(product), Some(quantity), Some(unit_price)) if errors.is_empty() => {
                Ok(OrderDraft {
                    user: UserRef { id: user },
                    product: ProductRef { id: product },
                    quantity,
                    unit_price,
                    date: self.date,
                })
            }
            _ => Err(errors),
        }
    }
}

/// 日期必须是 `YYYY-MM-DD` 格式且不晚于今天
pub fn is_valid_date(raw: &str, today: NaiveDate) -> bool {
    match crate::model::wire_date::parse(raw) {
        Ok(date) => date <= today,
        Err(_) => false,
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}
