use std::fmt;
use std::str::FromStr;

use crate::error::{AdminError, Result};
use crate::model::RecordId;

/// 当前所在的管理页面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Users,
    Orders,
}

impl Screen {
    pub const NAMES: &'static [&'static str] = &["users", "orders"];
}

impl FromStr for Screen {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "users" | "usuarios" => Ok(Screen::Users),
            "orders" | "ordenes" | "órdenes" => Ok(Screen::Orders),
            other => Err(AdminError::Command(format!("未知页面 '{}'", other))),
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Screen::Users => write!(f, "users"),
            Screen::Orders => write!(f, "orders"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMove {
    First,
    Prev,
    Next,
    Last,
    To(usize),
}

impl PageMove {
    pub const NAMES: &'static [&'static str] = &["first", "prev", "next", "last"];
}

/// `key=value` 形式的表单字段，保持输入顺序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, String)>);

impl Fields {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// 拒绝不在允许列表中的字段
    pub fn only(&self, allowed: &[&str]) -> Result<()> {
        match self.keys().find(|k| !allowed.contains(k)) {
            Some(key) => Err(AdminError::Command(format!(
                "未知字段 '{}'，可用字段: {}",
                key,
                allowed.join(", ")
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Use(Screen),
    List,
    Reload,
    Search(String),
    Page(PageMove),
    Size(usize),
    Show(RecordId),
    New(Fields),
    Edit(RecordId, Fields),
    Delete(RecordId),
    Confirm,
    Cancel,
    Totals,
    Products,
    Help,
    Exit,
}

impl Command {
    pub const KEYWORDS: &'static [&'static str] = &[
        "use", "list", "reload", "search", "page", "size", "show", "new", "edit", "delete",
        "confirm", "cancel", "totals", "products",
    ];

    pub const META_COMMANDS: &'static [&'static str] = &[".help", ".exit", ".quit"];
}

pub const HELP: &str = "\
use users|orders          切换页面（进入订单页面时同时加载用户和产品）
list                      显示当前页
reload                    从服务重新加载
search [关键词]           搜索，省略关键词时清除
page first|prev|next|last|<n>
size <n>                  每页条数
show <id>                 从服务读取单条记录
new key=value ...         新建（用户: first last second email [active]；订单: user product qty price）
edit <id> key=value ...   编辑用户
delete <id>               标记删除，随后 confirm 或 cancel
totals                    订单总计与 Smartphone 合计
products                  列出可选产品
.help  .exit  .quit";

/// 按空白切分，双引号内的空白保留
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(AdminError::Command("引号未闭合".to_string()));
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_id(raw: Option<&String>) -> Result<RecordId> {
    let raw = raw.ok_or_else(|| AdminError::Command("缺少记录ID".to_string()))?;
    raw.parse()
        .map_err(|_| AdminError::Command(format!("无效的记录ID '{}'", raw)))
}

fn parse_fields(tokens: &[String]) -> Result<Fields> {
    let mut fields = Vec::with_capacity(tokens.len());
    for token in tokens {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| AdminError::Command(format!("字段应为 key=value 形式: '{}'", token)))?;
        fields.push((key.to_lowercase(), value.to_string()));
    }
    Ok(Fields(fields))
}

/// 解析一行输入；空行和 `#` 注释返回 `None`
pub fn parse(line: &str) -> Result<Option<Command>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (head, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (trimmed, ""),
    };

    // 搜索词按原样保留
    if head.eq_ignore_ascii_case("search") {
        return Ok(Some(Command::Search(rest.to_string())));
    }

    let args = tokenize(rest)?;
    let command = match head.to_lowercase().as_str() {
        "use" => {
            let name = args
                .first()
                .ok_or_else(|| AdminError::Command("用法: use users|orders".to_string()))?;
            Command::Use(name.parse()?)
        }
        "list" | "ls" => Command::List,
        "reload" => Command::Reload,
        "page" => {
            let arg = args.first().map(String::as_str).unwrap_or("next");
            Command::Page(match arg {
                "first" => PageMove::First,
                "prev" | "previous" => PageMove::Prev,
                "next" => PageMove::Next,
                "last" => PageMove::Last,
                n => PageMove::To(
                    n.parse()
                        .map_err(|_| AdminError::Command(format!("无效的页码 '{}'", n)))?,
                ),
            })
        }
        "size" => {
            let raw = args
                .first()
                .ok_or_else(|| AdminError::Command("用法: size <n>".to_string()))?;
            Command::Size(
                raw.parse()
                    .map_err(|_| AdminError::Command(format!("无效的每页条数 '{}'", raw)))?,
            )
        }
        "show" => Command::Show(parse_id(args.first())?),
        "new" => Command::New(parse_fields(&args)?),
        "edit" => Command::Edit(parse_id(args.first())?, parse_fields(args.get(1..).unwrap_or(&[]))?),
        "delete" | "rm" => Command::Delete(parse_id(args.first())?),
        "confirm" => Command::Confirm,
        "cancel" => Command::Cancel,
        "totals" => Command::Totals,
        "products" => Command::Products,
        ".help" | "help" => Command::Help,
        ".exit" | ".quit" | "exit" | "quit" => Command::Exit,
        other => return Err(AdminError::Command(format!("未知命令 '{}'，输入 .help 查看帮助", other))),
    };

    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_with_quotes() {
        let tokens = tokenize(r#"first="Ana María" last=López  email=a@b.co"#).unwrap();
        assert_eq!(tokens, vec!["first=Ana María", "last=López", "email=a@b.co"]);
        assert!(tokenize(r#"first="Ana"#).is_err());
        assert_eq!(tokenize(r#"x="""#).unwrap(), vec!["x="]);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("  # comentario").unwrap(), None);
        assert_eq!(
            parse("use orders").unwrap(),
            Some(Command::Use(Screen::Orders))
        );
        assert_eq!(
            parse("page last").unwrap(),
            Some(Command::Page(PageMove::Last))
        );
        assert_eq!(
            parse("page 3").unwrap(),
            Some(Command::Page(PageMove::To(3)))
        );
        assert_eq!(parse("size 10").unwrap(), Some(Command::Size(10)));
        assert_eq!(parse("delete 7").unwrap(), Some(Command::Delete(7)));
        assert_eq!(parse(".quit").unwrap(), Some(Command::Exit));
    }

    #[test]
    fn test_search_keeps_inner_spaces() {
        assert_eq!(
            parse("search  ana lópez ").unwrap(),
            Some(Command::Search("ana lópez".to_string()))
        );
        assert_eq!(
            parse("search").unwrap(),
            Some(Command::Search(String::new()))
        );
    }

    #[test]
    fn test_parse_edit_fields() {
        let command = parse("edit 4 email=new@x.io active=false").unwrap().unwrap();
        match command {
            Command::Edit(id, fields) => {
                assert_eq!(id, 4);
                assert_eq!(fields.get("email"), Some("new@x.io"));
                assert_eq!(fields.get("active"), Some("false"));
                assert!(fields.only(&["email", "active"]).is_ok());
                assert!(fields.only(&["email"]).is_err());
            }
            other => panic!("应为 edit 命令: {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("frobnicate").is_err());
        assert!(parse("use warehouse").is_err());
        assert!(parse("delete abc").is_err());
        assert!(parse("new first").is_err());
        assert!(parse("size").is_err());
    }
}
