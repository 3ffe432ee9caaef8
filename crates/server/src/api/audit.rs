//! Structured audit logging for searches.
//!
//! Provides [`AuditContext`] (inserted by auth middleware into request extensions)
//! and [`audit_event`] for emitting structured audit log entries with `target: "audit"`.
//! Operators can filter/route audit events via `RUST_LOG=audit=info`.

/// Identity and request context for audit logging.
///
/// Inserted into request extensions by the auth middleware for every
/// protected route. Handlers extract it via `Option<Extension<AuditContext>>`.
#[derive(Clone, Debug)]
pub struct AuditContext {
    /// Authenticated user id.
    pub actor: String,
    /// Masked bearer token (first 8 chars + "...").
    pub token_prefix: String,
    /// Client IP from `X-Forwarded-For` / `X-Real-IP` headers, or "-".
    pub client_ip: String,
}

/// Mask a bearer token for safe logging: first 8 chars + "...".
pub fn mask_token(token: &str) -> String {
    match token.char_indices().nth(8) {
        Some((idx, _)) => format!("{}...", &token[..idx]),
        None => "***".to_string(),
    }
}

/// Extract client IP from request headers (X-Forwarded-For → X-Real-IP → "-").
pub fn extract_client_ip(req: &axum::http::Request<axum::body::Body>) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or("-").trim().to_string())
        .or_else(|| {
            req.headers()
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| "-".to_string())
}

/// Emit a structured audit log entry.
pub fn audit_event(ctx: &AuditContext, action: &str, detail: &str, outcome: &str) {
    tracing::info!(
        target: "audit",
        actor = %ctx.actor,
        token = %ctx.token_prefix,
        client_ip = %ctx.client_ip,
        action = %action,
        detail = %detail,
        outcome = %outcome,
        "audit"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("abcdefghijklmnop"), "abcdefgh...");
        assert_eq!(mask_token("12345678"), "***");
        assert_eq!(mask_token(""), "***");
    }

    #[test]
    fn test_mask_token_multibyte() {
        // Must not split a UTF-8 sequence.
        assert_eq!(mask_token("ääääääääää"), "ääääääää...");
    }

    #[test]
    fn test_mask_token_never_reveals_full_token() {
        let token = "super-secret-session-token-12345";
        let masked = mask_token(token);
        assert!(!masked.contains("secret"));
        assert!(masked.ends_with("..."));
    }

    #[test]
    fn test_extract_ip_x_forwarded_for_chain() {
        let req = axum::http::Request::builder()
            .header("x-forwarded-for", "  10.0.0.1 , 172.16.0.1")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&req), "10.0.0.1");
    }

    #[test]
    fn test_extract_ip_x_real_ip_fallback() {
        let req = axum::http::Request::builder()
            .header("x-real-ip", "172.16.0.5")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&req), "172.16.0.5");
    }

    #[test]
    fn test_extract_ip_no_headers_returns_dash() {
        let req = axum::http::Request::builder()
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_client_ip(&req), "-");
    }

    #[test]
    fn test_audit_event_captures_fields() {
        use std::sync::{Arc, Mutex};
        use tracing_subscriber::layer::SubscriberExt;

        #[derive(Default, Clone)]
        struct Captured {
            actor: String,
            action: String,
            outcome: String,
        }

        struct CaptureLayer {
            captured: Arc<Mutex<Vec<Captured>>>,
        }

        impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
            fn on_event(
                &self,
                event: &tracing::Event<'_>,
                _ctx: tracing_subscriber::layer::Context<'_, S>,
            ) {
                if event.metadata().target() != "audit" {
                    return;
                }
                struct Visitor(Captured);
                impl tracing::field::Visit for Visitor {
                    fn record_debug(
                        &mut self,
                        field: &tracing::field::Field,
                        value: &dyn std::fmt::Debug,
                    ) {
                        let val = format!("{:?}", value);
                        match field.name() {
                            "actor" => self.0.actor = val,
                            "action" => self.0.action = val,
                            "outcome" => self.0.outcome = val,
                            _ => {}
                        }
                    }
                }
                let mut visitor = Visitor(Captured::default());
                event.record(&mut visitor);
                self.captured.lock().unwrap().push(visitor.0);
            }
        }

        let captured = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(CaptureLayer {
            captured: captured.clone(),
        });

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("operational log, not audited");
            let ctx = AuditContext {
                actor: "librarian-1".into(),
                token_prefix: "abcdefgh...".into(),
                client_ip: "10.0.0.1".into(),
            };
            audit_event(&ctx, "search", "query=Faust results=3", "ranked");
        });

        let events = captured.lock().unwrap();
        assert_eq!(events.len(), 1);
        // Display-formatted fields arrive through record_debug unquoted
        assert_eq!(events[0].actor, "librarian-1");
        assert_eq!(events[0].action, "search");
        assert_eq!(events[0].outcome, "ranked");
    }
}
