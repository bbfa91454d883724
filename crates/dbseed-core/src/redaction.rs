use serde::{Deserialize, Serialize};

/// Connection metadata with secrets redacted, safe to log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactedConnection {
    pub driver: Option<String>,
    pub user: Option<String>,
    pub server: Option<String>,
    pub database: Option<String>,
    /// `trusted` when no password is supplied, `credentials` otherwise.
    pub auth: String,
    pub redacted: String,
}

/// Redact secrets from a connection string while extracting non-sensitive metadata.
///
/// Understands URL form (`postgres://user:pw@host:5432/db?sslmode=require`)
/// and keyword form (`host=db user=seed password=pw dbname=erp` or the
/// `;`-separated ODBC style).
pub fn redact_connection_string(conn: &str) -> RedactedConnection {
    if conn.contains("://") {
        redact_url(conn)
    } else {
        redact_keywords(conn)
    }
}

fn redact_url(conn: &str) -> RedactedConnection {
    let mut redacted = conn.to_string();
    let mut user = None;
    let mut server = None;
    let mut database = None;
    let mut has_password = false;

    let scheme_end = conn.find("://").unwrap_or(0);
    let driver = Some(conn[..scheme_end].to_string());
    let after_scheme = &conn[scheme_end + 3..];
    let (auth_part, host_part) = match after_scheme.find('@') {
        Some(at_idx) => (&after_scheme[..at_idx], &after_scheme[at_idx + 1..]),
        None => ("", after_scheme),
    };

    if !auth_part.is_empty() {
        if let Some(colon_idx) = auth_part.find(':') {
            user = Some(auth_part[..colon_idx].to_string());
            has_password = colon_idx + 1 < auth_part.len();
            let password_start = scheme_end + 3 + colon_idx + 1;
            let password_end = scheme_end + 3 + auth_part.len();
            redacted.replace_range(password_start..password_end, "***");
        } else {
            user = Some(auth_part.to_string());
        }
    }

    let host_part = host_part.split('?').next().unwrap_or("");
    let (host_port, path) = match host_part.find('/') {
        Some(slash_idx) => (&host_part[..slash_idx], &host_part[slash_idx + 1..]),
        None => (host_part, ""),
    };
    if !host_port.is_empty() {
        server = Some(host_port.to_string());
    }
    if !path.is_empty() {
        database = Some(path.to_string());
    }

    let (redacted, query_password) = redact_query_params(&redacted);

    RedactedConnection {
        driver,
        user,
        server,
        database,
        auth: auth_mode(has_password || query_password),
        redacted,
    }
}

fn redact_query_params(conn: &str) -> (String, bool) {
    let Some(query_start) = conn.find('?') else {
        return (conn.to_string(), false);
    };

    let (base, query) = conn.split_at(query_start + 1);
    let mut found = false;
    let params: Vec<String> = query
        .split('&')
        .map(|pair| {
            let key = pair.split('=').next().unwrap_or("");
            if is_sensitive_key(key) {
                found = true;
                format!("{key}=***")
            } else {
                pair.to_string()
            }
        })
        .collect();

    (format!("{base}{}", params.join("&")), found)
}

fn redact_keywords(conn: &str) -> RedactedConnection {
    let separator = if conn.contains(';') { ';' } else { ' ' };
    let mut driver = None;
    let mut user = None;
    let mut server = None;
    let mut database = None;
    let mut has_password = false;
    let mut trusted = false;
    let mut parts = Vec::new();

    for pair in conn.split(separator).filter(|pair| !pair.trim().is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key_lower = key.trim().to_ascii_lowercase();
        let value = value.trim();
        match key_lower.as_str() {
            "driver" => driver = Some(value.to_string()),
            "user" | "uid" | "user id" | "username" => user = Some(value.to_string()),
            "host" | "server" | "data source" => server = Some(value.to_string()),
            "dbname" | "database" | "initial catalog" => database = Some(value.to_string()),
            "trusted_connection" | "integrated security" => {
                trusted = matches!(value.to_ascii_lowercase().as_str(), "yes" | "true" | "sspi")
            }
            _ => {}
        }

        if is_sensitive_key(&key_lower) {
            has_password = !value.is_empty();
            parts.push(format!("{}=***", key.trim()));
        } else {
            parts.push(pair.trim().to_string());
        }
    }

    let joined = if separator == ';' {
        format!("{};", parts.join(";"))
    } else {
        parts.join(" ")
    };

    RedactedConnection {
        driver,
        user,
        server,
        database,
        auth: auth_mode(has_password && !trusted),
        redacted: joined,
    }
}

fn auth_mode(has_password: bool) -> String {
    let mode = if has_password { "credentials" } else { "trusted" };
    mode.to_string()
}

fn is_sensitive_key(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "password" | "pwd" | "pass" | "token" | "api_key" | "apikey"
    )
}
