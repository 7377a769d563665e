use crate::model::Order;

/// 订单页面固定统计的产品类别
pub const SMARTPHONE_CATEGORY: &str = "Smartphone";

/// 所有订单的合计金额
pub fn grand_total(orders: &[Order]) -> f64 {
    orders.iter().map(Order::line_total).sum()
}

/// 指定产品类别的订单合计金额
pub fn category_subtotal(orders: &[Order], category: &str) -> f64 {
    orders
        .iter()
        .filter(|o| o.category() == Some(category))
        .map(Order::line_total)
        .sum()
}
