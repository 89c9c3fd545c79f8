//! 하네스 설정 — switchyard.toml 파싱 및 환경변수 오버라이드
//!
//! [`HarnessSettings`]는 테스트 하네스 전역 설정을 담는 최상위 구조체입니다.
//! 테스트 클래스별 설정은 선언적 마커에서 오며, 여기에는 실행 환경
//! 단위의 설정(로깅, 컨텍스트 시작 생략 플래그 등)만 둡니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`SWITCHYARD_GENERAL_LOG_LEVEL=debug` 형식)
//! 2. 설정 파일 (`switchyard.toml`)
//! 3. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), switchyard_core::error::SettingsError> {
//! use switchyard_core::config::HarnessSettings;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let settings = HarnessSettings::load("switchyard.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let settings = HarnessSettings::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SettingsError;

/// 컨텍스트 자동 시작을 생략하는 프로세스 전역 플래그
pub const SKIP_CONTEXT_START_ENV: &str = "SWITCHYARD_SKIP_CONTEXT_START";

/// Switchyard 하네스 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessSettings {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralSettings,
    /// 생명주기 설정
    #[serde(default)]
    pub lifecycle: LifecycleSettings,
}

impl HarnessSettings {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let mut settings = Self::from_file(path).await?;
        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SettingsError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                SettingsError::Io(e)
            }
        })?;
        let settings = Self::parse(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// 기본값에 환경변수 오버라이드만 적용한 설정을 반환합니다.
    ///
    /// 설정 파일 없이 실행되는 테스트의 기본 경로입니다.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env_overrides();
        settings
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, SettingsError> {
        toml::from_str(toml_str).map_err(|e| SettingsError::ParseFailed {
            reason: e.to_string(),
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SWITCHYARD_{SECTION}_{FIELD}`
    /// 단, 컨텍스트 시작 생략 플래그는 [`SKIP_CONTEXT_START_ENV`]를 사용합니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SWITCHYARD_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SWITCHYARD_GENERAL_LOG_FORMAT");

        // Lifecycle
        override_bool(
            &mut self.lifecycle.skip_context_start,
            SKIP_CONTEXT_START_ENV,
        );
        override_u64(
            &mut self.lifecycle.assert_wait_ms,
            "SWITCHYARD_LIFECYCLE_ASSERT_WAIT_MS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(SettingsError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(SettingsError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            });
        }

        if self.lifecycle.assert_wait_ms == 0 || self.lifecycle.assert_wait_ms > MAX_ASSERT_WAIT_MS {
            return Err(SettingsError::InvalidValue {
                field: "lifecycle.assert_wait_ms".to_owned(),
                reason: format!("must be 1-{MAX_ASSERT_WAIT_MS}"),
            });
        }

        Ok(())
    }
}

/// 테스트 더블 검증 대기 시간 상한
const MAX_ASSERT_WAIT_MS: u64 = 600_000;

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 생명주기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleSettings {
    /// 셋업 마지막 단계에서 컨텍스트 시작을 생략할지 여부
    pub skip_context_start: bool,
    /// 테스트 더블 기대값 검증 시 기본 대기 시간 (밀리초)
    pub assert_wait_ms: u64,
}

impl LifecycleSettings {
    /// 검증 대기 시간을 `Duration`으로 반환합니다.
    pub fn assert_wait(&self) -> Duration {
        Duration::from_millis(self.assert_wait_ms)
    }
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            skip_context_start: false,
            assert_wait_ms: 10_000,
        }
    }
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        // 대소문자 무시 ("TRUE", "False" 허용)
        match val.to_ascii_lowercase().parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
