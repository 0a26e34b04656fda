//! 事件处理器（EventHandler）与注册表
//!
//! 定义消费某类/多类/全部事件的处理逻辑与元信息（名称、订阅类型），
//! `HandlerRegistry` 按事件类型索引处理器。
//!
use crate::error::DomainResult as Result;
use crate::eventing::BusEvent;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandledEventType {
    One(String),
    Many(Vec<String>),
    All,
}

/// 事件处理器：处理某一类型的事件
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// 处理器名称（用于日志与审计）
    fn handler_name(&self) -> &str;
    /// 返回该处理器支持的事件类型
    fn handled_event_type(&self) -> HandledEventType;
    /// 处理事件
    async fn handle(&self, event: &BusEvent) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    by_type: HashMap<String, Vec<Arc<dyn EventHandler>>>,
    all: Vec<Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new(handlers: Vec<Arc<dyn EventHandler>>) -> Self {
        let mut by_type: HashMap<String, Vec<Arc<dyn EventHandler>>> = HashMap::new();
        let mut all: Vec<Arc<dyn EventHandler>> = Vec::new();

        for h in handlers {
            match h.handled_event_type() {
                HandledEventType::All => all.push(h),
                HandledEventType::One(t) => {
                    by_type.entry(t).or_default().push(h);
                }
                HandledEventType::Many(ts) => {
                    for t in ts {
                        by_type.entry(t).or_default().push(h.clone());
                    }
                }
            }
        }

        Self { by_type, all }
    }

    /// 匹配的处理器：先按类型精确匹配，再追加订阅全部事件的处理器
    pub fn matching(&self, event_type: &str) -> Vec<Arc<dyn EventHandler>> {
        let mut merged: Vec<Arc<dyn EventHandler>> = Vec::new();
        if let Some(list) = self.by_type.get(event_type) {
            merged.extend(list.iter().cloned());
        }
        merged.extend(self.all.iter().cloned());
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty() && self.all.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named {
        name: &'static str,
        handles: HandledEventType,
    }

    #[async_trait]
    impl EventHandler for Named {
        fn handler_name(&self) -> &str {
            self.name
        }
        fn handled_event_type(&self) -> HandledEventType {
            self.handles.clone()
        }
        async fn handle(&self, _event: &BusEvent) -> Result<()> {
            Ok(())
        }
    }

    fn names(hs: &[Arc<dyn EventHandler>]) -> Vec<String> {
        hs.iter().map(|h| h.handler_name().to_string()).collect()
    }

    #[test]
    fn matching_merges_typed_and_catch_all_handlers() {
        let registry = HandlerRegistry::new(vec![
            Arc::new(Named {
                name: "welcome",
                handles: HandledEventType::One("user.created".into()),
            }),
            Arc::new(Named {
                name: "audit",
                handles: HandledEventType::All,
            }),
            Arc::new(Named {
                name: "multi",
                handles: HandledEventType::Many(vec![
                    "user.created".into(),
                    "translation.created".into(),
                ]),
            }),
        ]);

        assert_eq!(
            names(&registry.matching("user.created")),
            vec!["welcome", "multi", "audit"]
        );
        assert_eq!(
            names(&registry.matching("translation.created")),
            vec!["multi", "audit"]
        );
        assert_eq!(names(&registry.matching("order.placed")), vec!["audit"]);
        assert!(!registry.is_empty());
        assert!(HandlerRegistry::default().is_empty());
    }
}
