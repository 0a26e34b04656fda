//! 领域事件（Domain Event）与事件集合
//!
//! 定义事件载荷需要实现的最小接口（`DomainEvent`）、事件元数据
//! `EventMetadata`，以及聚合在一次业务操作中累积事件的 `RaisedEvents`。

mod domain_event_trait;
mod metadata;
mod raised_events;

pub use domain_event_trait::DomainEvent;
pub use metadata::EventMetadata;
pub use raised_events::RaisedEvents;
