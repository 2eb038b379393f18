//! Connection Configuration

use serde::{Deserialize, Serialize};

// ============================================================================
// ConnectionConfig
// ============================================================================

/// 연결 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// 연결 ID (HELLO 응답의 `connection_id`)
    pub connection_id: String,
    /// 서버 에이전트 (HELLO 응답의 `server`)
    pub server_agent: String,
    /// `db`가 지정되지 않은 요청의 데이터베이스
    pub default_database: String,
    /// 요청 큐 크기
    pub request_queue_size: usize,
    /// 응답 큐 크기
    pub response_queue_size: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connection_id: "bolt-0".to_string(),
            server_agent: format!("Zeta4G/{}", env!("CARGO_PKG_VERSION")),
            default_database: "zeta4g".to_string(),
            request_queue_size: 64,
            response_queue_size: 256,
        }
    }
}

impl ConnectionConfig {
    /// 빌더 패턴으로 연결 설정 생성
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }
}

/// 연결 설정 빌더
#[derive(Debug, Clone, Default)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// 연결 ID 설정
    pub fn connection_id(mut self, id: impl Into<String>) -> Self {
        self.config.connection_id = id.into();
        self
    }

    /// 서버 에이전트 설정
    pub fn server_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.server_agent = agent.into();
        self
    }

    /// 기본 데이터베이스 설정
    pub fn default_database(mut self, database: impl Into<String>) -> Self {
        self.config.default_database = database.into();
        self
    }

    /// 요청 큐 크기 설정 (최소 1)
    pub fn request_queue_size(mut self, size: usize) -> Self {
        self.config.request_queue_size = size.max(1);
        self
    }

    /// 응답 큐 크기 설정 (최소 1)
    pub fn response_queue_size(mut self, size: usize) -> Self {
        self.config.response_queue_size = size.max(1);
        self
    }

    /// 설정 빌드
    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}
