use std::cell::RefCell;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Failure,
}

/// 操作结果提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn failure(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Failure,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == NotificationKind::Success
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// 向用户展示操作结果
pub trait Notifier {
    fn notify(&self, notification: Notification);
}

/// 直接打印到终端，成功为绿色，失败为红色
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => println!("\x1b[32m✔ {}\x1b[0m", notification),
            NotificationKind::Failure => println!("\x1b[31m✘ {}\x1b[0m", notification),
        }
    }
}

/// 收集所有提示而不输出
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    received: RefCell<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<Notification> {
        self.received.borrow().clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.received.borrow().last().cloned()
    }

    pub fn failures(&self) -> usize {
        self.received
            .borrow()
            .iter()
            .filter(|n| !n.is_success())
            .count()
    }

    pub fn clear(&self) {
        self.received.borrow_mut().clear();
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.received.borrow_mut().push(notification);
    }
}
