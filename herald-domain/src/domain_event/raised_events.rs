use std::ops::Deref;
use std::slice::Iter;

use crate::error::DomainResult;
use crate::outbox::OutboxEvent;

use super::DomainEvent;

/// 一次业务操作中累积的事件，按产生顺序排列
///
/// 事件在 `raise` 时即被序列化为 Outbox 行，调用方随后在同一事务中
/// 通过 `take` 取出并写入 Outbox。
#[derive(Debug, Default)]
pub struct RaisedEvents {
    events: Vec<OutboxEvent>,
}

impl RaisedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个领域事件
    pub fn raise<E>(&mut self, event: &E) -> DomainResult<()>
    where
        E: DomainEvent,
    {
        self.events.push(OutboxEvent::from_domain_event(event)?);
        Ok(())
    }

    pub fn events(&self) -> &[OutboxEvent] {
        &self.events
    }

    /// 取出全部事件并清空集合
    pub fn take(&mut self) -> Vec<OutboxEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn iter(&self) -> Iter<'_, OutboxEvent> {
        self.events.iter()
    }
}

impl Deref for RaisedEvents {
    type Target = [OutboxEvent];

    fn deref(&self) -> &Self::Target {
        &self.events
    }
}

impl<'a> IntoIterator for &'a RaisedEvents {
    type Item = &'a OutboxEvent;
    type IntoIter = Iter<'a, OutboxEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
