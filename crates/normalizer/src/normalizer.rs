//! 결과 정규화기: 백엔드 이름으로 파서를 찾아 [`Finding`] 목록을 만듭니다.
//!
//! # 규칙
//!
//! - 결과가 없는 백엔드는 finding 을 만들지 않습니다.
//! - 결과는 있지만 finding 이 없으면 Info "no findings" 레코드 하나를 만듭니다.
//! - 문서 전체를 해석할 수 없으면 Info "output could not be parsed" 레코드 하나를 만듭니다.
//! - ID 는 `<접두사>-<순번>`이며 순번은 한 번의 정규화 호출 안에서 1부터 이어집니다.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use pentaflow_core::config::PentaflowConfig;
use pentaflow_core::metrics as m;
use pentaflow_core::types::{Finding, Severity};
use pentaflow_session_store::{SessionStore, SessionStoreError};
use tracing::{debug, warn};

use crate::envelope::{self, Envelope};
use crate::error::NormalizerError;
use crate::parser::{
    ArjunParser, BackendParser, DalfoxParser, DirsearchParser, DnsreconParser, Draft,
    GenericParser, NiktoParser, NmapParser, NucleiParser, ParseOutcome, SslyzeParser,
    TestsslParser, Wafw00fParser, WhatwebParser, WpscanParser, ZapParser,
};

/// 백엔드 이름 → 파서 레지스트리
#[derive(Clone, Default)]
pub struct ResultNormalizer {
    parsers: HashMap<String, Arc<dyn BackendParser>>,
}

impl fmt::Debug for ResultNormalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.parsers.keys().collect();
        keys.sort();
        f.debug_struct("ResultNormalizer")
            .field("parsers", &keys)
            .finish()
    }
}

impl ResultNormalizer {
    /// 빈 레지스트리. 모든 백엔드가 [`GenericParser`]로 처리됩니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 백엔드 13종의 파서를 등록한 레지스트리
    pub fn with_default_parsers() -> Self {
        let mut normalizer = Self::new();
        let defaults: [(&str, Arc<dyn BackendParser>); 13] = [
            ("nuclei", Arc::new(NucleiParser)),
            ("nikto", Arc::new(NiktoParser)),
            ("zap", Arc::new(ZapParser)),
            ("wpscan", Arc::new(WpscanParser)),
            ("nmap", Arc::new(NmapParser)),
            ("dirsearch", Arc::new(DirsearchParser)),
            ("sslyze", Arc::new(SslyzeParser)),
            ("testssl", Arc::new(TestsslParser)),
            ("whatweb", Arc::new(WhatwebParser)),
            ("arjun", Arc::new(ArjunParser)),
            ("dalfox", Arc::new(DalfoxParser)),
            ("wafw00f", Arc::new(Wafw00fParser)),
            ("dnsrecon", Arc::new(DnsreconParser)),
        ];
        for (name, parser) in defaults {
            normalizer.register(name, parser);
        }
        normalizer
    }

    /// 설정의 `[[backends]]`에 지정된 `parser` 키를 별칭으로 연결합니다.
    ///
    /// `parser`가 등록되지 않은 키를 가리키면 에러입니다.
    pub fn from_config(config: &PentaflowConfig) -> Result<Self, NormalizerError> {
        let mut normalizer = Self::with_default_parsers();
        for backend in &config.backends {
            let key = backend.parser_key();
            if key != backend.name {
                normalizer.alias(&backend.name, key)?;
            }
        }
        Ok(normalizer)
    }

    /// 파서를 등록합니다. 같은 이름이 있으면 교체합니다.
    pub fn register(&mut self, backend: impl Into<String>, parser: Arc<dyn BackendParser>) {
        self.parsers.insert(backend.into(), parser);
    }

    /// `backend`가 이미 등록된 `parser_key`의 파서를 사용하도록 합니다.
    pub fn alias(&mut self, backend: &str, parser_key: &str) -> Result<(), NormalizerError> {
        let parser = self
            .parsers
            .get(parser_key)
            .cloned()
            .ok_or_else(|| NormalizerError::UnknownParser(parser_key.to_owned()))?;
        self.parsers.insert(backend.to_owned(), parser);
        Ok(())
    }

    /// 백엔드 파서. 등록되지 않았으면 백엔드 이름을 접두사로 쓰는 [`GenericParser`].
    pub fn parser_for(&self, backend: &str) -> Arc<dyn BackendParser> {
        self.parsers
            .get(backend)
            .cloned()
            .unwrap_or_else(|| Arc::new(GenericParser::new(backend)))
    }

    /// 백엔드 하나의 결과를 정규화합니다.
    pub fn normalize(&self, backend: &str, raw: Option<&[u8]>) -> Vec<Finding> {
        self.normalize_all([(backend, raw)])
    }

    /// 여러 백엔드의 결과를 한 번에 정규화합니다. 순번은 호출 전체에서 이어집니다.
    pub fn normalize_all<'a, I>(&self, results: I) -> Vec<Finding>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a [u8]>)>,
    {
        let mut sequence = 0usize;
        let mut findings = Vec::new();
        for (backend, raw) in results {
            let Some(raw) = raw else {
                debug!(backend, "no stored result");
                continue;
            };
            let parser = self.parser_for(backend);
            let drafts = self.drafts(backend, parser.as_ref(), raw);
            metrics::counter!(m::NORMALIZER_FINDINGS_TOTAL, m::LABEL_BACKEND => backend.to_owned())
                .increment(drafts.len() as u64);

            for draft in drafts {
                sequence += 1;
                findings.push(Finding {
                    id: format!("{}-{sequence}", parser.prefix()),
                    source_backend: backend.to_owned(),
                    title: draft.title,
                    severity: draft.severity,
                    description: draft.description,
                });
            }
        }
        findings
    }

    /// 세션에 저장된 모든 결과를 정규화합니다. 백엔드 순서는 이름 순입니다.
    pub async fn normalize_session<S: SessionStore>(
        &self,
        store: &S,
        session_id: &str,
    ) -> Result<Vec<Finding>, SessionStoreError> {
        let backends = store.list_results(session_id).await?;
        let mut stored: Vec<(String, Option<Bytes>)> = Vec::with_capacity(backends.len());
        for backend in backends {
            let raw = store.get_result(session_id, &backend).await?;
            stored.push((backend, raw));
        }
        Ok(self.normalize_all(
            stored
                .iter()
                .map(|(backend, raw)| (backend.as_str(), raw.as_deref())),
        ))
    }

    fn drafts(&self, backend: &str, parser: &dyn BackendParser, raw: &[u8]) -> Vec<Draft> {
        let text = String::from_utf8_lossy(raw);
        if text.trim().is_empty() {
            return vec![no_findings(backend)];
        }

        let parsed = match envelope::unwrap(&text) {
            Envelope::Bare => parser.parse(&text),
            Envelope::Wrapped { native, findings } => {
                let native = native.map(|n| parser.parse(&n));
                match native {
                    Some(Ok(outcome)) if !outcome.drafts.is_empty() || findings.is_empty() => {
                        Ok(outcome)
                    }
                    Some(Err(e)) if findings.is_empty() => Err(e),
                    None if findings.is_empty() => Ok(ParseOutcome::default()),
                    _ => Ok(GenericParser::new(backend).parse_values(&findings)),
                }
            }
        };

        match parsed {
            Ok(outcome) => {
                if outcome.skipped > 0 {
                    warn!(backend, skipped = outcome.skipped, "skipped malformed records");
                    metrics::counter!(
                        m::NORMALIZER_SKIPPED_RECORDS_TOTAL,
                        m::LABEL_BACKEND => backend.to_owned()
                    )
                    .increment(outcome.skipped as u64);
                }
                match (outcome.drafts.is_empty(), outcome.skipped) {
                    (false, _) => outcome.drafts,
                    (true, 0) => vec![no_findings(backend)],
                    (true, skipped) => vec![unparseable(
                        backend,
                        &format!("all {skipped} records were malformed"),
                    )],
                }
            }
            Err(e) => {
                warn!(backend, error = %e, "result could not be parsed");
                vec![unparseable(backend, &e.to_string())]
            }
        }
    }
}

fn no_findings(backend: &str) -> Draft {
    Draft {
        title: format!("{backend}: no findings"),
        severity: Severity::Info,
        description: format!("{backend} completed and reported nothing"),
    }
}

fn unparseable(backend: &str, reason: &str) -> Draft {
    Draft {
        title: format!("{backend} output could not be parsed"),
        severity: Severity::Info,
        description: reason.to_owned(),
    }
}
