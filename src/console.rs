pub mod command;
pub mod helper;

use std::fs;
use std::path::Path;
use std::rc::Rc;

use chrono::{Local, NaiveDate};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};

use crate::controller::totals::SMARTPHONE_CATEGORY;
use crate::controller::{InsertPolicy, ListController};
use crate::error::{AdminError, Result};
use crate::model::{Order, OrderDraft, Product, Record, RecordId, User, UserDraft};
use crate::notify::{Notification, Notifier};
use crate::render::{TableView, render_list, render_totals};
use crate::service::CollectionService;
use crate::validate::{OrderForm, UserForm};
use command::{Command, Fields, HELP, PageMove, Screen};
use helper::CommandHelper;

const USER_FIELDS: &[&str] = &["first", "last", "second", "email", "active"];
const ORDER_FIELDS: &[&str] = &["user", "product", "qty", "price"];

const USER_NOUN: &str = "用户";
const ORDER_NOUN: &str = "订单";

/// 命令执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    Text(String),
    Nothing,
    Exit,
}

fn turn<S>(controller: &mut ListController<S>, page_move: PageMove)
where
    S: CollectionService,
    S::Item: Record,
{
    match page_move {
        PageMove::First => controller.first_page(),
        PageMove::Prev => controller.prev_page(),
        PageMove::Next => controller.next_page(),
        PageMove::Last => controller.last_page(),
        PageMove::To(n) => controller.set_page(n),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_active(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "si" | "sí" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(AdminError::Command(format!(
            "active 只能是 true 或 false，收到 '{}'",
            other
        ))),
    }
}

/// 用户与订单管理终端
///
/// 同一时间只显示一个页面。进入订单页面时会重新加载用户和产品参考列表，
/// 供订单表单校验所选的ID。
pub struct Console<U, O, P>
where
    U: CollectionService<Item = User, Draft = UserDraft>,
    O: CollectionService<Item = Order, Draft = OrderDraft>,
    P: CollectionService<Item = Product>,
{
    users: ListController<U>,
    orders: ListController<O>,
    products: P,
    product_choices: Vec<Product>,
    user_choices: Vec<User>,
    screen: Screen,
    notifier: Rc<dyn Notifier>,
    clock: fn() -> NaiveDate,
}

impl<U, O, P> Console<U, O, P>
where
    U: CollectionService<Item = User, Draft = UserDraft>,
    O: CollectionService<Item = Order, Draft = OrderDraft>,
    P: CollectionService<Item = Product>,
{
    pub fn new(
        users: U,
        orders: O,
        products: P,
        notifier: Rc<dyn Notifier>,
        page_size: usize,
    ) -> Result<Self> {
        Ok(Self {
            users: ListController::new(
                users,
                notifier.clone(),
                USER_NOUN,
                InsertPolicy::SortedByDateDesc,
            )
            .with_page_size(page_size)?,
            orders: ListController::new(
                orders,
                notifier.clone(),
                ORDER_NOUN,
                InsertPolicy::ReloadAfterCreate,
            )
            .with_page_size(page_size)?,
            products,
            product_choices: Vec::new(),
            user_choices: Vec::new(),
            screen: Screen::Users,
            notifier,
            clock: today,
        })
    }

    /// 替换"今天"的来源，新建记录的日期取自这里
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn users(&self) -> &ListController<U> {
        &self.users
    }

    pub fn orders(&self) -> &ListController<O> {
        &self.orders
    }

    pub fn product_choices(&self) -> &[Product] {
        &self.product_choices
    }

    pub fn user_choices(&self) -> &[User] {
        &self.user_choices
    }

    /// 切换页面并加载该页面需要的数据
    pub fn mount(&mut self, screen: Screen) {
        self.screen = screen;
        tracing::info!(target: "records_admin::console", %screen, "mounting screen");

        // 加载失败时控制器已发出提示并保留之前的集合，页面照常显示
        let loaded = match screen {
            Screen::Users => self.users.load(),
            Screen::Orders => {
                self.load_choices();
                self.orders.load()
            }
        };
        if let Err(err) = loaded {
            tracing::debug!(
                target: "records_admin::console",
                %screen,
                error = %err,
                "screen mounted with previous collection"
            );
        }
    }

    fn load_choices(&mut self) {
        match self.users.service().list() {
            Ok(users) => self.user_choices = users,
            Err(err) => {
                tracing::warn!(target: "records_admin::console", error = %err, "user choices unavailable");
                self.notifier
                    .notify(Notification::failure("错误", "无法加载用户列表"));
            }
        }
        match self.products.list() {
            Ok(products) => self.product_choices = products,
            Err(err) => {
                tracing::warn!(target: "records_admin::console", error = %err, "product choices unavailable");
                self.notifier
                    .notify(Notification::failure("错误", "无法加载产品列表"));
            }
        }
    }

    /// 渲染当前页面
    pub fn render(&self) -> String {
        match self.screen {
            Screen::Users => render_list(&self.users.view(), USER_NOUN),
            Screen::Orders => {
                let mut out = render_list(&self.orders.view(), ORDER_NOUN);
                out.push_str(&self.render_totals());
                out
            }
        }
    }

    fn render_totals(&self) -> String {
        render_totals(
            self.orders.grand_total(),
            SMARTPHONE_CATEGORY,
            self.orders.category_subtotal(SMARTPHONE_CATEGORY),
        )
    }

    pub fn execute(&mut self, line: &str) -> Result<CommandOutput> {
        let Some(command) = command::parse(line)? else {
            return Ok(CommandOutput::Nothing);
        };
        tracing::debug!(target: "records_admin::console", ?command, "executing");
        self.dispatch(command)
    }

    pub fn dispatch(&mut self, command: Command) -> Result<CommandOutput> {
        match command {
            Command::Use(screen) => self.mount(screen),
            Command::List => {}
            Command::Reload => match self.screen {
                Screen::Users => {
                    self.users.load()?;
                }
                Screen::Orders => {
                    self.load_choices();
                    self.orders.load()?;
                }
            },
            Command::Search(term) => match self.screen {
                Screen::Users => self.users.set_search_term(&term),
                Screen::Orders => self.orders.set_search_term(&term),
            },
            Command::Page(page_move) => self.turn_page(page_move),
            Command::Size(size) => match self.screen {
                Screen::Users => self.users.set_page_size(size)?,
                Screen::Orders => self.orders.set_page_size(size)?,
            },
            Command::Show(id) => return self.show(id),
            Command::New(fields) => {
                match self.screen {
                    Screen::Users => self.create_user(&fields)?,
                    Screen::Orders => self.create_order(&fields)?,
                };
            }
            Command::Edit(id, fields) => match self.screen {
                Screen::Users => self.edit_user(id, &fields)?,
                Screen::Orders => {
                    return Err(AdminError::Command("订单创建后不能编辑".to_string()));
                }
            },
            Command::Delete(id) => match self.screen {
                Screen::Users => self.users.request_delete(id)?,
                Screen::Orders => self.orders.request_delete(id)?,
            },
            Command::Confirm => {
                match self.screen {
                    Screen::Users => self.users.confirm_delete()?,
                    Screen::Orders => self.orders.confirm_delete()?,
                };
            }
            Command::Cancel => {
                let was_pending = match self.screen {
                    Screen::Users => self.users.cancel_delete(),
                    Screen::Orders => self.orders.cancel_delete(),
                };
                if !was_pending {
                    return Err(AdminError::NoPendingDelete);
                }
            }
            Command::Totals => return Ok(CommandOutput::Text(self.render_totals())),
            Command::Products => {
                return Ok(CommandOutput::Text(
                    TableView::of(&self.product_choices).to_string(),
                ));
            }
            Command::Help => return Ok(CommandOutput::Text(HELP.to_string())),
            Command::Exit => return Ok(CommandOutput::Exit),
        }

        Ok(CommandOutput::Text(self.render()))
    }

    fn turn_page(&mut self, page_move: PageMove) {
        match self.screen {
            Screen::Users => turn(&mut self.users, page_move),
            Screen::Orders => turn(&mut self.orders, page_move),
        }
    }

    fn show(&self, id: RecordId) -> Result<CommandOutput> {
        let table = match self.screen {
            Screen::Users => self
                .users
                .fetch(id)?
                .map(|user| TableView::of([&user]).to_string()),
            Screen::Orders => self
                .orders
                .fetch(id)?
                .map(|order| TableView::of([&order]).to_string()),
        };
        table
            .map(CommandOutput::Text)
            .ok_or(AdminError::NotFound(id))
    }

    fn create_user(&mut self, fields: &Fields) -> Result<RecordId> {
        fields.only(USER_FIELDS)?;
        let form = UserForm {
            first_name: fields.get("first").unwrap_or_default().to_string(),
            last_name: fields.get("last").unwrap_or_default().to_string(),
            second_last_name: fields.get("second").unwrap_or_default().to_string(),
            email: fields.get("email").unwrap_or_default().to_string(),
            active: fields.get("active").map(parse_active).transpose()?.unwrap_or(true),
            registered_on: Some((self.clock)()),
        };
        self.users.submit_create(&form)
    }

    fn edit_user(&mut self, id: RecordId, fields: &Fields) -> Result<()> {
        fields.only(USER_FIELDS)?;
        let user = self.users.find(id).ok_or(AdminError::NotFound(id))?;

        let mut form = UserForm::from_user(user);
        if let Some(first) = fields.get("first") {
            form.first_name = first.to_string();
        }
        if let Some(last) = fields.get("last") {
            form.last_name = last.to_string();
        }
        if let Some(second) = fields.get("second") {
            form.second_last_name = second.to_string();
        }
        if let Some(email) = fields.get("email") {
            form.email = email.to_string();
        }
        if let Some(active) = fields.get("active") {
            form.active = parse_active(active)?;
        }
        self.users.submit_update(id, &form)
    }

    fn create_order(&mut self, fields: &Fields) -> Result<RecordId> {
        fields.only(ORDER_FIELDS)?;
        let form = OrderForm {
            user_id: fields.get("user").unwrap_or_default(),
            product_id: fields.get("product").unwrap_or_default(),
            quantity: fields.get("qty").unwrap_or_default(),
            unit_price: fields.get("price").unwrap_or_default(),
            date: (self.clock)(),
            users: &self.user_choices,
            products: &self.product_choices,
        };
        self.orders.submit_create(&form)
    }

    /// 逐行执行命令，失败的行打印错误后继续
    pub fn run_lines<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) -> Vec<Result<CommandOutput>> {
        let mut results = Vec::new();
        for line in lines {
            let result = self.execute(line);
            let exit = matches!(result, Ok(CommandOutput::Exit));
            results.push(result);
            if exit {
                break;
            }
        }
        results
    }

    /// 执行脚本文件，每行一条命令
    pub fn run_script(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)?;
        tracing::info!(target: "records_admin::console", path = %path.display(), "running script");

        self.mount(Screen::Users);
        println!("{}", self.render());

        for result in self.run_lines(content.lines()) {
            match result {
                Ok(CommandOutput::Text(text)) => println!("{}", text),
                Ok(CommandOutput::Nothing) | Ok(CommandOutput::Exit) => {}
                Err(e) => eprintln!("执行错误: {}", e),
            }
        }
        Ok(())
    }

    /// 交互模式，历史记录保存在 `history` 指定的文件中
    pub fn run_interactive(&mut self, history: Option<&Path>) -> Result<()> {
        let config = Config::builder().auto_add_history(true).build();
        let mut editor: Editor<CommandHelper, DefaultHistory> = Editor::with_config(config)?;
        let mut helper = CommandHelper::new();
        helper.with_colored_prompt("\x1b[1;32madmin>\x1b[0m ".to_owned());
        editor.set_helper(Some(helper));

        if let Some(path) = history {
            if editor.load_history(path).is_err() {
                tracing::debug!(target: "records_admin::console", path = %path.display(), "no previous history");
            }
        }

        println!("用户与订单管理终端，输入 .help 查看帮助");
        self.mount(Screen::Users);
        println!("{}", self.render());

        loop {
            let prompt = format!("{}> ", self.screen);
            match editor.readline(&prompt) {
                Ok(line) => match self.execute(&line) {
                    Ok(CommandOutput::Text(text)) => println!("{}", text),
                    Ok(CommandOutput::Nothing) => {}
                    Ok(CommandOutput::Exit) => break,
                    Err(e) => eprintln!("\x1b[31m{}\x1b[0m", e),
                },
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(path) = history {
            editor.save_history(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProductDraft;
    use crate::notify::MemoryNotifier;
    use crate::service::MemoryCollection;

    type TestConsole = Console<
        MemoryCollection<User, UserDraft>,
        MemoryCollection<Order, OrderDraft>,
        MemoryCollection<Product, ProductDraft>,
    >;

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn console() -> (TestConsole, Rc<MemoryNotifier>) {
        let notifier = Rc::new(MemoryNotifier::new());
        let console = Console::new(
            MemoryCollection::new("usuario", vec![]),
            MemoryCollection::new("orden", vec![]),
            MemoryCollection::new(
                "producto",
                vec![Product {
                    id: 1,
                    name: "Pixel".to_string(),
                    category: "Smartphone".to_string(),
                    currency: "MXN".to_string(),
                    status: 1,
                }],
            ),
            notifier.clone(),
            5,
        )
        .unwrap()
        .with_clock(fixed_today);
        (console, notifier)
    }

    #[test]
    fn test_parse_active() {
        assert!(parse_active("sí").unwrap());
        assert!(!parse_active("0").unwrap());
        assert!(parse_active("maybe").is_err());
    }

    #[test]
    fn test_create_user_uses_clock_for_registration() {
        let (mut console, notifier) = console();
        console.mount(Screen::Users);
        console
            .execute(r#"new first=Ana last="De la Cruz" second=Ruiz email=ana@x.io"#)
            .unwrap();

        let user = &console.users().collection()[0];
        assert_eq!(user.last_name, "De la Cruz");
        assert_eq!(user.registered_on, fixed_today());
        assert!(notifier.last().unwrap().is_success());
    }

    #[test]
    fn test_unknown_field_rejected_before_request() {
        let (mut console, _) = console();
        console.mount(Screen::Users);
        let err = console.execute("new nombre=Ana").unwrap_err();
        assert!(matches!(err, AdminError::Command(_)));
        assert_eq!(console.users().service().calls().create, 0);
    }

    #[test]
    fn test_cancel_without_pending_is_error() {
        let (mut console, _) = console();
        console.mount(Screen::Users);
        assert!(matches!(
            console.execute("cancel"),
            Err(AdminError::NoPendingDelete)
        ));
    }

    #[test]
    fn test_orders_screen_loads_choices_and_rejects_edit() {
        let (mut console, _) = console();
        console.execute("use orders").unwrap();
        assert_eq!(console.screen(), Screen::Orders);
        assert_eq!(console.product_choices().len(), 1);
        assert!(matches!(
            console.execute("edit 1 qty=2"),
            Err(AdminError::Command(_))
        ));
    }

    #[test]
    fn test_mount_survives_failed_load() {
        let (mut console, notifier) = console();
        console.users().service().set_failing(true);

        console.mount(Screen::Users);
        assert_eq!(console.screen(), Screen::Users);
        assert_eq!(notifier.failures(), 1);
        assert_eq!(console.render(), "没有已登记的用户\n");
    }

    #[test]
    fn test_run_lines_stops_at_exit() {
        let (mut console, _) = console();
        let results = console.run_lines(["# setup", "list", ".exit", "list"]);
        assert_eq!(results.len(), 3);
        assert!(matches!(results[0], Ok(CommandOutput::Nothing)));
        assert!(matches!(results[2], Ok(CommandOutput::Exit)));
    }
}
