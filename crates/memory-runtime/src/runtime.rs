//! 컨텍스트 팩토리 — [`MemoryRuntime`]
//!
//! 팩토리에 설정한 속성 파일 위치와 초기 속성은 이후 생성되는 모든
//! 컨텍스트에 적용됩니다. 컨텍스트마다 독립된 속성 제공자를 가지므로
//! 한 테스트의 오버라이드가 다른 컨텍스트로 새지 않습니다.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use switchyard_core::error::RuntimeError;
use switchyard_core::properties::Properties;
use switchyard_core::runtime::{ContextFactory, ContextSpec, RuntimeContext};

use crate::context::MemoryContext;
use crate::properties::MemoryPropertyProvider;
use crate::stats::{RuntimeStats, StatsSnapshot};

/// 인메모리 런타임 (컨텍스트 팩토리)
///
/// # 사용 예시
/// ```
/// use switchyard_core::runtime::{ContextFactory, ContextSpec};
/// use switchyard_core::registry::Registry;
/// use switchyard_memory::MemoryRuntime;
///
/// let runtime = MemoryRuntime::new().with_property("greeting", "hello");
/// let context = runtime
///     .create_context(ContextSpec {
///         name: "doc".to_owned(),
///         registry: Registry::new(),
///         management_enabled: false,
///     })
///     .unwrap();
/// assert_eq!(context.name(), "doc");
/// assert_eq!(runtime.stats().contexts_created, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRuntime {
    property_locations: Vec<PathBuf>,
    initial_properties: Properties,
    stats: Arc<RuntimeStats>,
}

impl MemoryRuntime {
    /// 기본 설정의 런타임을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 속성 파일(TOML) 위치를 추가합니다.
    pub fn with_property_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.property_locations.push(path.into());
        self
    }

    /// 초기 속성을 추가합니다.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.initial_properties.insert(key, value);
        self
    }

    /// 지금까지의 통계를 반환합니다.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl ContextFactory for MemoryRuntime {
    fn create_context(&self, spec: ContextSpec) -> Result<Arc<dyn RuntimeContext>, RuntimeError> {
        if spec.name.trim().is_empty() {
            return Err(RuntimeError::InvalidState {
                service: "memory-runtime".to_owned(),
                reason: "context name must not be empty".to_owned(),
            });
        }

        let properties = Arc::new(MemoryPropertyProvider::new(
            self.property_locations.clone(),
            self.initial_properties.clone(),
        ));
        debug!(
            context = %spec.name,
            beans = spec.registry.len(),
            management = spec.management_enabled,
            "creating memory context"
        );
        let context = MemoryContext::new(spec, properties, Arc::clone(&self.stats));
        self.stats.record_created();
        Ok(Arc::new(context))
    }
}
