use std::cell::{Cell, RefCell};
use std::marker::PhantomData;

use super::CollectionService;
use crate::error::ApiError;
use crate::model::{Order, OrderDraft, Product, ProductDraft, Record, RecordId, User, UserDraft};

/// 由提交数据生成记录（内存服务模拟后端分配ID）
pub trait Materialize<D>: Sized {
    fn materialize(id: RecordId, draft: &D, previous: Option<&Self>) -> Self;
}

impl Materialize<UserDraft> for User {
    fn materialize(id: RecordId, draft: &UserDraft, previous: Option<&Self>) -> Self {
        let registered_on = draft
            .registered_on
            .or(previous.map(|p| p.registered_on))
            .unwrap_or_default();
        User {
            id,
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            second_last_name: draft.second_last_name.clone(),
            email: draft.email.clone(),
            status: draft.status,
            registered_on,
        }
    }
}

impl Materialize<OrderDraft> for Order {
    fn materialize(id: RecordId, draft: &OrderDraft, previous: Option<&Self>) -> Self {
        Order {
            id,
            user: previous.and_then(|p| p.user.clone()),
            product: previous.and_then(|p| p.product.clone()),
            quantity: draft.quantity,
            unit_price: draft.unit_price,
            date: draft.date,
        }
    }
}

impl Materialize<ProductDraft> for Product {
    fn materialize(id: RecordId, draft: &ProductDraft, _previous: Option<&Self>) -> Self {
        Product {
            id,
            name: draft.name.clone(),
            category: draft.category.clone(),
            currency: draft.currency.clone(),
            status: draft.status,
        }
    }
}

/// 各操作的调用次数
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub list: usize,
    pub get: usize,
    pub create: usize,
    pub update: usize,
    pub delete: usize,
}

impl CallCounts {
    pub fn mutations(&self) -> usize {
        self.create + self.update + self.delete
    }
}

/// 内存中的集合服务，行为与 HTTP 服务一致，可注入失败
pub struct MemoryCollection<I, D> {
    collection: &'static str,
    items: RefCell<Vec<I>>,
    next_id: Cell<RecordId>,
    failing: Cell<bool>,
    calls: Cell<CallCounts>,
    _draft: PhantomData<fn() -> D>,
}

impl<I: Record, D> MemoryCollection<I, D> {
    pub fn new(collection: &'static str, items: Vec<I>) -> Self {
        let next_id = items.iter().map(Record::id).max().unwrap_or(0) + 1;
        Self {
            collection,
            items: RefCell::new(items),
            next_id: Cell::new(next_id),
            failing: Cell::new(false),
            calls: Cell::new(CallCounts::default()),
            _draft: PhantomData,
        }
    }

    /// 之后的所有调用都返回 500
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn calls(&self) -> CallCounts {
        self.calls.get()
    }

    pub fn snapshot(&self) -> Vec<I> {
        self.items.borrow().clone()
    }

    /// 绕过服务接口直接写入后端数据（模拟其他客户端的修改）
    pub fn push_remote(&self, item: I) {
        self.next_id.set(self.next_id.get().max(item.id() + 1));
        self.items.borrow_mut().push(item);
    }

    fn record(
        &self,
        op: &'static str,
        bump: impl FnOnce(&mut CallCounts),
    ) -> Result<(), ApiError> {
        let mut calls = self.calls.get();
        bump(&mut calls);
        self.calls.set(calls);

        if self.failing.get() {
            return Err(ApiError::Status {
                op,
                collection: self.collection,
                status: 500,
            });
        }
        Ok(())
    }

    fn missing(&self, op: &'static str) -> ApiError {
        ApiError::Status {
            op,
            collection: self.collection,
            status: 404,
        }
    }
}

impl<I, D> CollectionService for MemoryCollection<I, D>
where
    I: Record + Materialize<D>,
{
    type Item = I;
    type Draft = D;

    fn collection(&self) -> &'static str {
        self.collection
    }

    fn list(&self) -> Result<Vec<I>, ApiError> {
        self.record("list", |c| c.list += 1)?;
        Ok(self.snapshot())
    }

    fn get(&self, id: RecordId) -> Result<Option<I>, ApiError> {
        self.record("get", |c| c.get += 1)?;
        Ok(self.items.borrow().iter().find(|i| i.id() == id).cloned())
    }

    fn create(&self, draft: &D) -> Result<I, ApiError> {
        self.record("create", |c| c.create += 1)?;
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let item = I::materialize(id, draft, None);
        self.items.borrow_mut().push(item.clone());
        Ok(item)
    }

    fn update(&self, id: RecordId, draft: &D) -> Result<I, ApiError> {
        self.record("update", |c| c.update += 1)?;
        let mut items = self.items.borrow_mut();
        let slot = items
            .iter_mut()
            .find(|i| i.id() == id)
            .ok_or_else(|| self.missing("update"))?;

        let updated = I::materialize(id, draft, Some(&*slot));
        *slot = updated.clone();
        Ok(updated)
    }

    fn delete(&self, id: RecordId) -> Result<(), ApiError> {
        self.record("delete", |c| c.delete += 1)?;
        let mut items = self.items.borrow_mut();
        let before = items.len();
        items.retain(|i| i.id() != id);
        if items.len() == before {
            return Err(self.missing("delete"));
        }
        Ok(())
    }
}
