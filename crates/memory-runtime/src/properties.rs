//! 속성 컴포넌트 — TOML 속성 파일 위치와 코드 수준 오버라이드
//!
//! 조회 우선순위: 오버라이드 > 위치에서 로드한 속성 > 초기 속성
//!
//! 속성 파일은 TOML이며 중첩 테이블은 점(`.`)으로 이어진 키로 평탄화됩니다.
//!
//! ```toml
//! [ftp]
//! username = "scott"   # → "ftp.username"
//! port = 21            # → "ftp.port" = "21"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use switchyard_core::error::RuntimeError;
use switchyard_core::properties::{Properties, PropertyProvider};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct PropertyState {
    overrides: Properties,
    loaded: Properties,
    initial: Properties,
    ignore_missing_location: bool,
}

/// 인메모리 런타임의 속성 제공자
#[derive(Debug, Default)]
pub struct MemoryPropertyProvider {
    locations: Vec<PathBuf>,
    state: Mutex<PropertyState>,
}

impl MemoryPropertyProvider {
    /// 속성 파일 위치와 초기 속성으로 제공자를 생성합니다.
    pub fn new(locations: Vec<PathBuf>, initial: Properties) -> Self {
        Self {
            locations,
            state: Mutex::new(PropertyState {
                initial,
                ..PropertyState::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PropertyState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 설정된 속성 파일 위치 목록
    pub fn locations(&self) -> &[PathBuf] {
        &self.locations
    }

    /// 속성 파일 위치에서 속성을 다시 로드합니다.
    ///
    /// 컨텍스트 시작 시 호출됩니다. 위치가 없을 때 무시 설정이 꺼져 있으면
    /// [`RuntimeError::PropertyLocationNotFound`]를 반환합니다.
    pub fn load_locations(&self) -> Result<(), RuntimeError> {
        let ignore_missing = self.lock().ignore_missing_location;
        let mut loaded = Properties::new();

        for location in &self.locations {
            match std::fs::read_to_string(location) {
                Ok(content) => {
                    let props = parse_properties(location, &content)?;
                    debug!(
                        location = %location.display(),
                        count = props.len(),
                        "loaded properties"
                    );
                    loaded.extend(props);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    if !ignore_missing {
                        return Err(RuntimeError::PropertyLocationNotFound {
                            path: location.display().to_string(),
                        });
                    }
                    warn!(location = %location.display(), "properties location not found, ignoring");
                }
                Err(e) => return Err(RuntimeError::Io(e)),
            }
        }

        self.lock().loaded = loaded;
        Ok(())
    }
}

impl PropertyProvider for MemoryPropertyProvider {
    fn set_override_properties(&self, properties: Properties) {
        self.lock().overrides = properties;
    }

    fn set_ignore_missing_location(&self, ignore: bool) {
        self.lock().ignore_missing_location = ignore;
    }

    fn ignore_missing_location(&self) -> bool {
        self.lock().ignore_missing_location
    }

    fn resolve(&self, key: &str) -> Option<String> {
        let state = self.lock();
        state
            .overrides
            .get(key)
            .or_else(|| state.loaded.get(key))
            .or_else(|| state.initial.get(key))
            .map(str::to_owned)
    }
}

fn parse_properties(location: &Path, content: &str) -> Result<Properties, RuntimeError> {
    let table = content.parse::<toml::Table>().map_err(|e| {
        RuntimeError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{}: {e}", location.display()),
        ))
    })?;
    let mut out = Properties::new();
    flatten("", &table, &mut out);
    Ok(out)
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut Properties) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(nested) => flatten(&full_key, nested, out),
            toml::Value::String(s) => out.insert(full_key, s.clone()),
            other => out.insert(full_key, other.to_string()),
        }
    }
}
