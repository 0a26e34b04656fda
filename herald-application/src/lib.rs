//! Herald 应用层：通知分发
//!
//! 消费总线事件并按渠道（站内信/推送/邮件/短信）扇出，渠道之间失败相互隔离。
//!
pub mod error;
pub mod events;
pub mod inmemory;
pub mod notification;
#[cfg(feature = "postgres")]
pub mod postgres;
