use std::fmt;

use chrono::{Datelike, NaiveDate};
use unicode_width::UnicodeWidthStr;

use crate::controller::ListView;
use crate::model::{Order, Product, User};

/// 可以显示为表格行的记录
pub trait Tabular {
    fn headers() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

impl Tabular for User {
    fn headers() -> &'static [&'static str] {
        &["ID", "名字", "父姓", "母姓", "邮箱", "状态", "注册日期"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.second_last_name.clone(),
            self.email.clone(),
            if self.is_active() { "活跃" } else { "停用" }.to_string(),
            format_date(self.registered_on),
        ]
    }
}

impl Tabular for Order {
    fn headers() -> &'static [&'static str] {
        &["ID", "用户", "产品", "类别", "数量", "单价", "合计", "日期"]
    }

    fn cells(&self) -> Vec<String> {
        let na = || "N/A".to_string();
        vec![
            self.id.to_string(),
            self.user
                .as_ref()
                .map(|u| format!("{} {}", u.first_name, u.last_name))
                .unwrap_or_else(na),
            self.product
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_else(na),
            self.category().map(str::to_string).unwrap_or_else(na),
            self.quantity.to_string(),
            format_currency(self.unit_price, DEFAULT_CURRENCY),
            format_currency(self.line_total(), DEFAULT_CURRENCY),
            format_date(self.date),
        ]
    }
}

impl Tabular for Product {
    fn headers() -> &'static [&'static str] {
        &["ID", "名称", "类别", "币种"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.category.clone(),
            self.currency.clone(),
        ]
    }
}

/// 终端表格
#[derive(Debug)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    pub fn of<'a, R: Tabular + 'a>(items: impl IntoIterator<Item = &'a R>) -> Self {
        Self {
            columns: R::headers().iter().map(|h| h.to_string()).collect(),
            rows: items.into_iter().map(R::cells).collect(),
        }
    }
}

fn pad(s: &str, width: usize) -> String {
    let fill = width.saturating_sub(s.width());
    format!("{}{}", s, " ".repeat(fill))
}

impl fmt::Display for TableView {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.columns.is_empty() {
            return Ok(());
        }

        // 按终端显示宽度计算每列的最大宽度，最窄 3 个字符
        let mut column_widths = Vec::with_capacity(self.columns.len());
        for (col_idx, column_name) in self.columns.iter().enumerate() {
            let max_width = self
                .rows
                .iter()
                .filter_map(|row| row.get(col_idx))
                .map(|cell| cell.width())
                .fold(column_name.width(), usize::max);
            column_widths.push(max_width.max(3));
        }

        // 表头
        write!(f, "|")?;
        for (column_name, &width) in self.columns.iter().zip(&column_widths) {
            write!(f, " {} |", pad(column_name, width))?;
        }
        writeln!(f)?;

        // 分隔线
        write!(f, "|")?;
        for &width in &column_widths {
            write!(f, " {} |", "-".repeat(width))?;
        }
        writeln!(f)?;

        // 数据行
        for row in &self.rows {
            write!(f, "|")?;
            for (col_idx, &width) in column_widths.iter().enumerate() {
                let cell = row.get(col_idx).map(String::as_str).unwrap_or("");
                write!(f, " {} |", pad(cell, width))?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// 页码导航：前五页，超过五页时加省略号和最后一页
pub fn page_numbers(page: usize, page_count: usize) -> String {
    let mut parts: Vec<String> = (1..=page_count.min(5))
        .map(|n| {
            if n == page {
                format!("[{}]", n)
            } else {
                n.to_string()
            }
        })
        .collect();

    if page_count > 5 {
        parts.push("…".to_string());
        if page > 5 && page < page_count {
            parts.push(format!("[{}]", page));
            parts.push("…".to_string());
        }
        if page == page_count {
            parts.push(format!("[{}]", page_count));
        } else {
            parts.push(page_count.to_string());
        }
    }

    let prev = if page <= 1 { "«" } else { "‹" };
    let next = if page >= page_count { "»" } else { "›" };
    format!("{} {} {}", prev, parts.join(" "), next)
}

/// 渲染当前页，`noun` 为实体名称
pub fn render_list<R: Tabular>(view: &ListView<'_, R>, noun: &str) -> String {
    if view.is_empty() {
        return if view.search.trim().is_empty() {
            format!("没有已登记的{}\n", noun)
        } else {
            format!("没有符合搜索条件的{}\n", noun)
        };
    }

    let mut out = TableView::of(view.visible.iter().copied()).to_string();
    let (start, end) = view.range();
    out.push_str(&format!(
        "显示第 {} 到 {} 条，共 {} 个{}  {}  每页 {} 条\n",
        start,
        end,
        view.filtered_len,
        noun,
        page_numbers(view.page, view.page_count),
        view.page_size
    ));
    if let Some(id) = view.pending_delete {
        out.push_str(&format!(
            "确认删除{} {}？此操作无法撤销。输入 confirm 确认或 cancel 取消\n",
            noun, id
        ));
    }
    out
}

pub const DEFAULT_CURRENCY: &str = "MXN";

/// 金额格式：`$1,234.50 MXN`
pub fn format_currency(amount: f64, currency: &str) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}${}.{:02} {}", sign, grouped, cents % 100, currency)
}

/// 日期格式：`2024年3月15日`
pub fn format_date(date: NaiveDate) -> String {
    format!("{}年{}月{}日", date.year(), date.month(), date.day())
}

/// 订单合计区块
pub fn render_totals(grand_total: f64, category: &str, subtotal: f64) -> String {
    format!(
        "总计: {}\n{} 合计: {}\n",
        format_currency(grand_total, DEFAULT_CURRENCY),
        category,
        format_currency(subtotal, DEFAULT_CURRENCY)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0, "MXN"), "$0.00 MXN");
        assert_eq!(format_currency(25.0, "MXN"), "$25.00 MXN");
        assert_eq!(format_currency(1234.5, "MXN"), "$1,234.50 MXN");
        assert_eq!(format_currency(1234567.891, "USD"), "$1,234,567.89 USD");
        assert_eq!(format_currency(-12.5, "MXN"), "-$12.50 MXN");
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(format_date(date), "2024年3月15日");
    }

    #[test]
    fn test_page_numbers() {
        assert_eq!(page_numbers(1, 1), "« [1] »");
        assert_eq!(page_numbers(2, 3), "‹ 1 [2] 3 ›");
        assert_eq!(page_numbers(1, 8), "« [1] 2 3 4 5 … 8 ›");
        assert_eq!(page_numbers(8, 8), "‹ 1 2 3 4 5 … [8] »");
        assert_eq!(page_numbers(6, 8), "‹ 1 2 3 4 5 … [6] … 8 ›");
    }

    #[test]
    fn test_table_alignment() {
        let table = TableView {
            columns: vec!["ID".to_string(), "名字".to_string()],
            rows: vec![
                vec!["1".to_string(), "Ana".to_string()],
                vec!["12".to_string(), "Guadalupe".to_string()],
            ],
        };
        let text = table.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "| ID  | 名字      |");
        assert_eq!(lines[1], "| --- | --------- |");
        assert_eq!(lines[3], "| 12  | Guadalupe |");
    }

    #[test]
    fn test_alignment_with_combining_marks_and_wide_chars() {
        let table = TableView {
            columns: vec!["名字".to_string()],
            rows: vec![
                // 分解形式的 é：e + U+0301
                vec!["Jose\u{301}".to_string()],
                vec!["Ana".to_string()],
                vec!["😀".to_string()],
            ],
        };
        let text = table.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "| 名字 |");
        assert_eq!(lines[2], "| Jose\u{301} |");
        assert_eq!(lines[3], "| Ana  |");
        assert_eq!(lines[4], "| 😀   |");
        assert_eq!("Jose\u{301}".width(), 4);
    }

    #[test]
    fn test_render_empty_states() {
        let view: ListView<'_, User> = ListView {
            visible: vec![],
            filtered_len: 0,
            total_len: 0,
            page: 1,
            page_count: 1,
            page_size: 5,
            search: "",
            pending_delete: None,
            submitting: false,
        };
        assert_eq!(render_list(&view, "用户"), "没有已登记的用户\n");

        let view = ListView { search: "zzz", total_len: 3, ..view };
        assert_eq!(render_list(&view, "用户"), "没有符合搜索条件的用户\n");
    }
}
