//! 의존성 레지스트리 — 컨텍스트가 참조하는 이름 있는 빈(bean) 저장소
//!
//! 오케스트레이터는 매 컨텍스트 생성 시 빈 [`Registry`]를 만들고,
//! 레지스트리 팩토리 역할 메서드가 있으면 이를 통과시킨 결과를
//! 컨텍스트 팩토리에 전달합니다.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

/// 이름으로 조회하는 빈 저장소
#[derive(Clone, Default)]
pub struct Registry {
    beans: BTreeMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Registry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 빈을 등록합니다. 같은 이름이 있으면 교체합니다.
    pub fn bind<B: Any + Send + Sync>(&mut self, name: impl Into<String>, bean: B) {
        self.beans.insert(name.into(), Arc::new(bean));
    }

    /// 빈 등록 후 자신을 반환합니다 (레지스트리 팩토리에서 체이닝용).
    pub fn with<B: Any + Send + Sync>(mut self, name: impl Into<String>, bean: B) -> Self {
        self.bind(name, bean);
        self
    }

    /// 이름과 타입으로 빈을 조회합니다.
    pub fn lookup<B: Any + Send + Sync>(&self, name: &str) -> Option<Arc<B>> {
        self.beans
            .get(name)
            .and_then(|bean| Arc::clone(bean).downcast::<B>().ok())
    }

    /// 등록 여부를 확인합니다.
    pub fn contains(&self, name: &str) -> bool {
        self.beans.contains_key(name)
    }

    /// 등록된 빈 이름 목록을 반환합니다.
    pub fn names(&self) -> Vec<&str> {
        self.beans.keys().map(String::as_str).collect()
    }

    /// 등록된 빈 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.beans.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.beans.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("beans", &self.names())
            .finish()
    }
}
