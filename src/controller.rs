pub mod filter;
pub mod page;
pub mod totals;

use std::rc::Rc;

use crate::error::{AdminError, Result};
use crate::model::{Order, Record, RecordId};
use crate::notify::{Notification, Notifier};
use crate::service::CollectionService;
use crate::validate::Form;
use page::PageWindow;

/// 新建或更新记录后集合的排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPolicy {
    /// 本地插入后按日期倒序排列（用户按注册日期）
    SortedByDateDesc,
    /// 创建成功后从服务重新加载整个集合，顺序以服务端为准（订单）
    ReloadAfterCreate,
}

/// 两步删除确认
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteState {
    #[default]
    Idle,
    Pending(RecordId),
}

/// 控制器状态的只读投影，界面据此渲染
#[derive(Debug)]
pub struct ListView<'a, R> {
    pub visible: Vec<&'a R>,
    pub filtered_len: usize,
    pub total_len: usize,
    pub page: usize,
    pub page_count: usize,
    pub page_size: usize,
    pub search: &'a str,
    pub pending_delete: Option<RecordId>,
    pub submitting: bool,
}

impl<R> ListView<'_, R> {
    /// 当前页显示的记录序号范围（从 1 开始，含两端）
    pub fn range(&self) -> (usize, usize) {
        let start = ((self.page - 1) * self.page_size + 1).min(self.filtered_len);
        let end = (self.page * self.page_size).min(self.filtered_len);
        (start, end)
    }

    pub fn is_empty(&self) -> bool {
        self.filtered_len == 0
    }
}

type Subscriber<R> = Box<dyn FnMut(&ListView<'_, R>)>;

/// 记录列表控制器
///
/// 持有从远程集合服务加载的完整集合，并在其上派生过滤结果、
/// 当前页和合计。所有修改都先调用服务，成功后才改动本地集合；
/// 失败时集合保持原样并发出失败提示。
pub struct ListController<S: CollectionService> {
    service: S,
    notifier: Rc<dyn Notifier>,
    /// 提示信息中使用的实体名称
    noun: &'static str,
    policy: InsertPolicy,
    collection: Vec<S::Item>,
    search: String,
    window: PageWindow,
    submitting: bool,
    delete_state: DeleteState,
    subscribers: Vec<Subscriber<S::Item>>,
}

impl<S> ListController<S>
where
    S: CollectionService,
    S::Item: Record,
{
    pub fn new(
        service: S,
        notifier: Rc<dyn Notifier>,
        noun: &'static str,
        policy: InsertPolicy,
    ) -> Self {
        Self {
            service,
            notifier,
            noun,
            policy,
            collection: Vec::new(),
            search: String::new(),
            window: PageWindow::default(),
            submitting: false,
            delete_state: DeleteState::Idle,
            subscribers: Vec::new(),
        }
    }

    pub fn with_page_size(mut self, size: usize) -> Result<Self> {
        self.window = PageWindow::new(size)?;
        Ok(self)
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn collection(&self) -> &[S::Item] {
        &self.collection
    }

    pub fn search_term(&self) -> &str {
        &self.search
    }

    pub fn page(&self) -> usize {
        self.window.index()
    }

    pub fn page_size(&self) -> usize {
        self.window.size()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn delete_state(&self) -> DeleteState {
        self.delete_state
    }

    pub fn policy(&self) -> InsertPolicy {
        self.policy
    }

    pub fn find(&self, id: RecordId) -> Option<&S::Item> {
        self.collection.iter().find(|r| r.id() == id)
    }

    /// 每次状态变化后调用
    pub fn subscribe(&mut self, subscriber: impl FnMut(&ListView<'_, S::Item>) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    // 以下为派生状态，每次读取时重新计算
    pub fn filtered(&self) -> Vec<&S::Item> {
        filter::filter(&self.collection, &self.search)
    }

    fn filtered_len(&self) -> usize {
        self.collection
            .iter()
            .filter(|r| filter::matches(*r, &self.search))
            .count()
    }

    pub fn page_count(&self) -> usize {
        page::page_count(self.filtered_len(), self.window.size())
    }

    pub fn visible(&self) -> Vec<&S::Item> {
        let mut filtered = self.filtered();
        let bounds = self.window.bounds(filtered.len());
        filtered.truncate(bounds.end);
        filtered.drain(..bounds.start);
        filtered
    }

    pub fn view(&self) -> ListView<'_, S::Item> {
        let filtered_len = self.filtered_len();
        ListView {
            visible: self.visible(),
            filtered_len,
            total_len: self.collection.len(),
            page: self.window.index(),
            page_count: page::page_count(filtered_len, self.window.size()),
            page_size: self.window.size(),
            search: &self.search,
            pending_delete: match self.delete_state {
                DeleteState::Pending(id) => Some(id),
                DeleteState::Idle => None,
            },
            submitting: self.submitting,
        }
    }

    /// 从服务加载完整集合，失败时保留现有集合
    pub fn load(&mut self) -> Result<usize> {
        match self.service.list() {
            Ok(items) => {
                self.replace_collection(items);
                tracing::debug!(
                    target: "records_admin::controller",
                    collection = self.service.collection(),
                    count = self.collection.len(),
                    "collection loaded"
                );
                self.changed();
                Ok(self.collection.len())
            }
            Err(err) => {
                tracing::warn!(
                    target: "records_admin::controller",
                    collection = self.service.collection(),
                    error = %err,
                    "load failed"
                );
                self.notifier.notify(Notification::failure(
                    "错误",
                    format!("无法加载{}列表", self.noun),
                ));
                Err(err.into())
            }
        }
    }

    /// 按ID从服务读取单条记录，不修改集合
    pub fn fetch(&self, id: RecordId) -> Result<Option<S::Item>> {
        self.service.get(id).map_err(|err| {
            tracing::warn!(
                target: "records_admin::controller",
                collection = self.service.collection(),
                id,
                error = %err,
                "fetch failed"
            );
            self.notifier.notify(Notification::failure(
                "错误",
                format!("无法获取{} {}", self.noun, id),
            ));
            AdminError::from(err)
        })
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search = term.to_string();
        self.window.reset();
        self.changed();
    }

    pub fn set_page(&mut self, n: usize) {
        let len = self.filtered_len();
        self.window.go_to(n, len);
        self.changed();
    }

    pub fn next_page(&mut self) {
        self.set_page(self.window.index().saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.window.index().saturating_sub(1));
    }

    pub fn first_page(&mut self) {
        self.set_page(1);
    }

    pub fn last_page(&mut self) {
        self.set_page(self.page_count());
    }

    pub fn set_page_size(&mut self, size: usize) -> Result<()> {
        self.window.resize(size)?;
        self.changed();
        Ok(())
    }

    /// 校验表单后创建记录，校验失败时不发出请求
    pub fn submit_create<F>(&mut self, form: &F) -> Result<RecordId>
    where
        F: Form<Draft = S::Draft>,
    {
        let draft = form.validate().map_err(AdminError::Validation)?;
        self.create(&draft)
    }

    /// 校验表单后更新记录，校验失败时不发出请求
    pub fn submit_update<F>(&mut self, id: RecordId, form: &F) -> Result<()>
    where
        F: Form<Draft = S::Draft>,
    {
        let draft = form.validate().map_err(AdminError::Validation)?;
        self.update(id, &draft)
    }

    pub fn create(&mut self, draft: &S::Draft) -> Result<RecordId> {
        self.begin_submit()?;

        let outcome = match self.service.create(draft) {
            Ok(record) => {
                let id = record.id();
                self.insert_created(record);
                self.notifier.notify(Notification::success(
                    format!("{}已创建", self.noun),
                    format!("{} {} 创建成功", self.noun, id),
                ));
                Ok(id)
            }
            Err(err) => {
                tracing::warn!(
                    target: "records_admin::controller",
                    collection = self.service.collection(),
                    error = %err,
                    "create failed"
                );
                self.notifier.notify(Notification::failure(
                    "错误",
                    format!("保存{}时发生错误", self.noun),
                ));
                Err(err.into())
            }
        };

        self.submitting = false;
        self.changed();
        outcome
    }

    pub fn update(&mut self, id: RecordId, draft: &S::Draft) -> Result<()> {
        let Some(position) = self.position(id) else {
            return Err(AdminError::NotFound(id));
        };
        self.begin_submit()?;

        let outcome = match self.service.update(id, draft) {
            Ok(record) => {
                self.collection[position] = record;
                self.apply_order();
                self.notifier.notify(Notification::success(
                    format!("{}已更新", self.noun),
                    format!("{} {} 更新成功", self.noun, id),
                ));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(
                    target: "records_admin::controller",
                    collection = self.service.collection(),
                    id,
                    error = %err,
                    "update failed"
                );
                self.notifier.notify(Notification::failure(
                    "错误",
                    format!("保存{}时发生错误", self.noun),
                ));
                Err(err.into())
            }
        };

        self.submitting = false;
        self.changed();
        outcome
    }

    /// 标记待删除的记录，需要 [`confirm_delete`](Self::confirm_delete) 才会真正删除
    pub fn request_delete(&mut self, id: RecordId) -> Result<()> {
        if self.position(id).is_none() {
            return Err(AdminError::NotFound(id));
        }
        self.delete_state = DeleteState::Pending(id);
        self.changed();
        Ok(())
    }

    /// 取消待删除标记，返回之前是否有待删除的记录
    pub fn cancel_delete(&mut self) -> bool {
        let was_pending = matches!(self.delete_state, DeleteState::Pending(_));
        self.delete_state = DeleteState::Idle;
        self.changed();
        was_pending
    }

    /// 删除已标记的记录；无论成功与否都回到 Idle
    pub fn confirm_delete(&mut self) -> Result<RecordId> {
        let DeleteState::Pending(id) = self.delete_state else {
            return Err(AdminError::NoPendingDelete);
        };
        self.begin_submit()?;
        self.delete_state = DeleteState::Idle;

        let outcome = match self.service.delete(id) {
            Ok(()) => {
                self.collection.retain(|r| r.id() != id);
                self.notifier.notify(Notification::success(
                    format!("{}已删除", self.noun),
                    format!("{} {} 已被删除", self.noun, id),
                ));
                Ok(id)
            }
            Err(err) => {
                tracing::warn!(
                    target: "records_admin::controller",
                    collection = self.service.collection(),
                    id,
                    error = %err,
                    "delete failed"
                );
                self.notifier.notify(Notification::failure(
                    "错误",
                    format!("删除{}时发生错误", self.noun),
                ));
                Err(err.into())
            }
        };

        self.submitting = false;
        self.changed();
        outcome
    }

    /// 同步调用下不会重入；嵌入异步界面时每次提交都从这里取得唯一的进行中标记
    fn begin_submit(&mut self) -> Result<()> {
        if self.submitting {
            tracing::debug!(
                target: "records_admin::controller",
                collection = self.service.collection(),
                "submission rejected while another is in flight"
            );
            return Err(AdminError::Busy);
        }
        self.submitting = true;
        Ok(())
    }

    fn position(&self, id: RecordId) -> Option<usize> {
        self.collection.iter().position(|r| r.id() == id)
    }

    fn insert_created(&mut self, record: S::Item) {
        match self.policy {
            InsertPolicy::SortedByDateDesc => self.splice(record),
            InsertPolicy::ReloadAfterCreate => match self.service.list() {
                Ok(items) => self.replace_collection(items),
                Err(err) => {
                    tracing::warn!(
                        target: "records_admin::controller",
                        collection = self.service.collection(),
                        error = %err,
                        "reload after create failed, keeping local copy"
                    );
                    self.notifier.notify(Notification::failure(
                        "错误",
                        format!("无法刷新{}列表", self.noun),
                    ));
                    self.splice(record);
                }
            },
        }
    }

    /// 用服务端返回的集合替换本地集合；待删除的记录已不存在时回到 Idle
    fn replace_collection(&mut self, items: Vec<S::Item>) {
        self.collection = items;
        self.apply_order();
        if let DeleteState::Pending(id) = self.delete_state {
            if self.find(id).is_none() {
                self.delete_state = DeleteState::Idle;
            }
        }
    }

    fn splice(&mut self, record: S::Item) {
        let id = record.id();
        self.collection.retain(|r| r.id() != id);
        match self.policy {
            InsertPolicy::SortedByDateDesc => {
                self.collection.insert(0, record);
                self.apply_order();
            }
            InsertPolicy::ReloadAfterCreate => self.collection.push(record),
        }
    }

    fn apply_order(&mut self) {
        if self.policy == InsertPolicy::SortedByDateDesc {
            // 稳定排序，同一天的记录保持原有先后
            self.collection
                .sort_by(|a, b| b.record_date().cmp(&a.record_date()));
        }
    }

    fn changed(&mut self) {
        let len = self.filtered_len();
        self.window.clamp(len);

        if self.subscribers.is_empty() {
            return;
        }
        let mut subscribers = std::mem::take(&mut self.subscribers);
        {
            let view = self.view();
            for subscriber in subscribers.iter_mut() {
                subscriber(&view);
            }
        }
        self.subscribers = subscribers;
    }
}

impl<S> ListController<S>
where
    S: CollectionService<Item = Order>,
{
    pub fn grand_total(&self) -> f64 {
        totals::grand_total(&self.collection)
    }

    pub fn category_subtotal(&self, category: &str) -> f64 {
        totals::category_subtotal(&self.collection, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{User, UserDraft};
    use crate::notify::MemoryNotifier;
    use crate::service::MemoryCollection;
    use crate::validate::UserForm;
    use chrono::NaiveDate;
    use std::cell::RefCell;

    type Users = ListController<MemoryCollection<User, UserDraft>>;

    fn user(id: i64, first: &str, registered: (i32, u32, u32)) -> User {
        User {
            id,
            first_name: first.to_string(),
            last_name: "Pérez".to_string(),
            second_last_name: "Gómez".to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            status: 1,
            registered_on: NaiveDate::from_ymd_opt(registered.0, registered.1, registered.2)
                .unwrap(),
        }
    }

    fn draft(first: &str, registered: (i32, u32, u32)) -> UserDraft {
        UserDraft {
            first_name: first.to_string(),
            last_name: "Pérez".to_string(),
            second_last_name: "Gómez".to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            status: 1,
            registered_on: NaiveDate::from_ymd_opt(registered.0, registered.1, registered.2),
        }
    }

    fn users_controller(seed: Vec<User>) -> (Users, Rc<MemoryNotifier>) {
        let notifier = Rc::new(MemoryNotifier::new());
        let service = MemoryCollection::new("usuario", seed);
        let mut controller = ListController::new(
            service,
            notifier.clone(),
            "用户",
            InsertPolicy::SortedByDateDesc,
        );
        controller.load().unwrap();
        notifier.clear();
        (controller, notifier)
    }

    fn ids(items: &[&User]) -> Vec<i64> {
        items.iter().map(|u| u.id).collect()
    }

    #[test]
    fn test_load_sorts_by_registration_desc() {
        let (controller, _) = users_controller(vec![
            user(1, "Ana", (2024, 1, 1)),
            user(2, "Beto", (2024, 2, 1)),
        ]);
        assert_eq!(ids(&controller.filtered()), vec![2, 1]);
    }

    #[test]
    fn test_create_splices_in_date_order() {
        let (mut controller, notifier) = users_controller(vec![
            user(1, "Ana", (2024, 1, 1)),
            user(2, "Beto", (2024, 2, 1)),
        ]);

        let id = controller.create(&draft("Carla", (2024, 3, 1))).unwrap();
        assert_eq!(id, 3);
        assert_eq!(ids(&controller.filtered()), vec![3, 2, 1]);
        assert!(notifier.last().unwrap().is_success());
        assert!(!controller.is_submitting());
    }

    #[test]
    fn test_failed_create_leaves_collection_untouched() {
        let (mut controller, notifier) = users_controller(vec![user(1, "Ana", (2024, 1, 1))]);
        controller.service().set_failing(true);

        let err = controller.create(&draft("Carla", (2024, 3, 1))).unwrap_err();
        assert!(matches!(err, AdminError::Api(_)));
        assert_eq!(controller.collection().len(), 1);
        assert_eq!(notifier.failures(), 1);
        assert!(!controller.is_submitting());
    }

    #[test]
    fn test_second_submission_rejected_while_in_flight() {
        let (mut controller, _) = users_controller(vec![]);
        controller.submitting = true;

        let err = controller.create(&draft("Carla", (2024, 3, 1))).unwrap_err();
        assert!(matches!(err, AdminError::Busy));
        assert_eq!(controller.service().calls().create, 0);
    }

    #[test]
    fn test_invalid_form_makes_no_request() {
        let (mut controller, notifier) = users_controller(vec![]);
        let form = UserForm {
            first_name: "Ana".to_string(),
            ..UserForm::default()
        };

        let err = controller.submit_create(&form).unwrap_err();
        match err {
            AdminError::Validation(errors) => assert!(errors.get("email").is_some()),
            other => panic!("应为校验错误: {}", other),
        }
        assert_eq!(controller.service().calls().mutations(), 0);
        assert!(notifier.received().is_empty());
    }

    #[test]
    fn test_update_replaces_in_place() {
        let (mut controller, _) = users_controller(vec![
            user(1, "Ana", (2024, 1, 1)),
            user(2, "Beto", (2024, 2, 1)),
            user(3, "Carla", (2024, 3, 1)),
        ]);

        let mut form = UserForm::from_user(controller.find(2).unwrap());
        form.email = "beto@corp.mx".to_string();
        controller.submit_update(2, &form).unwrap();

        assert_eq!(ids(&controller.filtered()), vec![3, 2, 1]);
        assert_eq!(controller.find(2).unwrap().email, "beto@corp.mx");
        // 编辑不改变注册日期
        assert_eq!(
            controller.find(2).unwrap().registered_on,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
    }

    #[test]
    fn test_update_unknown_id_makes_no_request() {
        let (mut controller, _) = users_controller(vec![user(1, "Ana", (2024, 1, 1))]);
        let err = controller
            .update(42, &draft("X", (2024, 1, 1)))
            .unwrap_err();
        assert!(matches!(err, AdminError::NotFound(42)));
        assert_eq!(controller.service().calls().update, 0);
    }

    #[test]
    fn test_delete_state_machine() {
        let (mut controller, _) = users_controller(vec![
            user(1, "Ana", (2024, 1, 1)),
            user(2, "Beto", (2024, 2, 1)),
        ]);

        assert!(matches!(
            controller.confirm_delete(),
            Err(AdminError::NoPendingDelete)
        ));

        controller.request_delete(1).unwrap();
        assert_eq!(controller.delete_state(), DeleteState::Pending(1));
        assert!(controller.cancel_delete());
        assert_eq!(controller.delete_state(), DeleteState::Idle);
        assert_eq!(controller.service().calls().delete, 0);

        controller.request_delete(1).unwrap();
        assert_eq!(controller.confirm_delete().unwrap(), 1);
        assert_eq!(controller.delete_state(), DeleteState::Idle);
        assert!(controller.find(1).is_none());
    }

    #[test]
    fn test_failed_delete_clears_pending_and_keeps_record() {
        let (mut controller, notifier) = users_controller(vec![user(1, "Ana", (2024, 1, 1))]);
        controller.request_delete(1).unwrap();
        controller.service().set_failing(true);

        assert!(controller.confirm_delete().is_err());
        assert_eq!(controller.delete_state(), DeleteState::Idle);
        assert!(controller.find(1).is_some());
        assert_eq!(notifier.failures(), 1);
    }

    #[test]
    fn test_request_delete_unknown_id() {
        let (mut controller, _) = users_controller(vec![]);
        assert!(matches!(
            controller.request_delete(5),
            Err(AdminError::NotFound(5))
        ));
        assert_eq!(controller.delete_state(), DeleteState::Idle);
    }

    #[test]
    fn test_failed_reload_keeps_collection() {
        let (mut controller, notifier) = users_controller(vec![user(1, "Ana", (2024, 1, 1))]);
        controller.service().set_failing(true);
        assert!(controller.load().is_err());
        assert_eq!(controller.collection().len(), 1);
        assert_eq!(notifier.failures(), 1);
    }

    #[test]
    fn test_reload_after_create_drops_stale_pending_delete() {
        use crate::model::{Order, OrderDraft, ProductRef, UserRef};

        let order = |id: i64| Order {
            id,
            user: None,
            product: None,
            quantity: 1,
            unit_price: 10.0,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        };
        let notifier = Rc::new(MemoryNotifier::new());
        let mut controller = ListController::new(
            MemoryCollection::new("orden", vec![order(1), order(2)]),
            notifier,
            "订单",
            InsertPolicy::ReloadAfterCreate,
        );
        controller.load().unwrap();
        controller.request_delete(1).unwrap();

        // 其他客户端已删除订单 1
        controller.service().delete(1).unwrap();

        let id = controller
            .create(&OrderDraft {
                user: UserRef { id: 1 },
                product: ProductRef { id: 1 },
                quantity: 2,
                unit_price: 5.0,
                date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            })
            .unwrap();

        let ids: Vec<i64> = controller.collection().iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![2, id]);
        assert_eq!(controller.delete_state(), DeleteState::Idle);
        assert!(controller.view().pending_delete.is_none());
    }

    #[test]
    fn test_search_resets_page_and_subscribers_observe_changes() {
        let seed = (1..=12)
            .map(|i| user(i, &format!("User{}", i), (2024, 1, i as u32)))
            .collect();
        let (mut controller, _) = users_controller(seed);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        controller.subscribe(move |view| {
            sink.borrow_mut().push((view.page, view.filtered_len, view.visible.len()))
        });

        controller.last_page();
        assert_eq!(controller.page(), 3);
        assert_eq!(controller.visible().len(), 2);

        controller.set_search_term("user1");
        assert_eq!(controller.page(), 1);

        // User1, User10, User11, User12
        assert_eq!(
            seen.borrow().as_slice(),
            &[(3, 12, 2), (1, 4, 4)]
        );
    }

    #[test]
    fn test_delete_on_last_page_clamps_page() {
        let seed = (1..=6)
            .map(|i| user(i, &format!("U{}", i), (2024, 1, i as u32)))
            .collect();
        let (mut controller, _) = users_controller(seed);
        controller.last_page();
        assert_eq!(controller.page(), 2);

        // 第二页只有最早注册的 U1
        let only = controller.visible()[0].id;
        controller.request_delete(only).unwrap();
        controller.confirm_delete().unwrap();
        assert_eq!(controller.page(), 1);
        assert_eq!(controller.visible().len(), 5);
    }

    #[test]
    fn test_page_size_change_resets_page() {
        let seed = (1..=12)
            .map(|i| user(i, &format!("U{}", i), (2024, 1, i as u32)))
            .collect();
        let (mut controller, _) = users_controller(seed);
        controller.set_page(2);
        controller.set_page_size(10).unwrap();
        assert_eq!(controller.page(), 1);
        assert_eq!(controller.page_count(), 2);
        assert!(controller.set_page_size(0).is_err());
        assert_eq!(controller.page_size(), 10);
    }
}
