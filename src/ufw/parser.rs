//! Pure parsing of `ufw status` output.
//!
//! ufw prints a human-readable table with inconsistent column packing: the
//! "From" column is variable-width and sometimes fused with direction text.
//! The parser binds positionally and degrades to fewer fields instead of
//! failing; malformed rows are expected, not exceptional. No I/O happens
//! here, so every case is covered by table tests over captured output.

use crate::ufw::{FirewallStatus, RuleRecord, RulesReport, StatusKind};

/// Interpret the trimmed output of `ufw status` as an overall state.
pub fn parse_status(output: &str) -> FirewallStatus {
    let output = output.trim();
    if output.contains("Status: active") {
        FirewallStatus::active()
    } else if output.contains("Status: inactive") {
        FirewallStatus::inactive()
    } else {
        // Verbose or localized variants land here with the raw text kept.
        FirewallStatus::unknown(output)
    }
}

/// Parse the full `ufw status` output into the reported state plus the
/// numbered rule table. Row order equals ufw's 1-based rule numbering.
pub fn parse_rules(output: &str) -> RulesReport {
    let lines: Vec<&str> = output.trim().lines().collect();

    let status = match lines.first().and_then(|l| status_line_kind(l)) {
        Some(kind) => kind,
        None => return RulesReport::empty(StatusKind::Unknown),
    };

    // ufw reports no rule table when disabled.
    if status == StatusKind::Inactive {
        return RulesReport::empty(status);
    }

    let header_index = lines
        .iter()
        .position(|l| l.contains("To") && l.contains("Action") && l.contains("From"));
    let separator_index = lines.iter().position(|l| is_separator_line(l));

    let (header_index, separator_index) = match (header_index, separator_index) {
        (Some(h), Some(s)) => (h, s),
        // Unexpected table layout is "no rules", not an error.
        _ => return RulesReport::empty(status),
    };

    // The header tokens are validated for arity, then discarded: rows bind
    // positionally into the fixed To/Action/From fields rather than keying
    // off whatever ufw printed in the header.
    let headers = split_columns(lines[header_index]);
    if headers.len() < 3 {
        return RulesReport::empty(status);
    }

    let mut rules = Vec::new();
    for line in lines.iter().skip(separator_index + 1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts = split_columns(line);
        if parts.len() >= 3 {
            rules.push(bind_row(&parts[0], &parts[1], &parts[2]));
        } else if parts.len() == 2 {
            if parts[1].contains("IN") || parts[1].contains("OUT") {
                // Action and From fused into one cell; split on the first
                // space and treat the remainder as From.
                let mut pieces = parts[1].splitn(2, ' ');
                let action = pieces.next().unwrap_or_default();
                let from = pieces.next().unwrap_or_default();
                rules.push(RuleRecord::new(parts[0].clone(), action, from));
            } else {
                rules.push(RuleRecord::new(parts[0].clone(), parts[1].clone(), ""));
            }
        }
        // Fewer than two parts is noise; skip silently.
    }

    RulesReport {
        status,
        rules,
        message: None,
    }
}

/// Match the leading "Status: (active|inactive)" line.
fn status_line_kind(line: &str) -> Option<StatusKind> {
    let rest = line.strip_prefix("Status: ")?;
    if rest.starts_with("inactive") {
        Some(StatusKind::Inactive)
    } else if rest.starts_with("active") {
        Some(StatusKind::Active)
    } else {
        None
    }
}

/// The separator row under the header: hyphen runs separated by whitespace.
fn is_separator_line(line: &str) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    tokens.len() >= 2 && tokens.iter().all(|t| t.chars().all(|c| c == '-'))
}

/// Split a table line on runs of two or more whitespace characters,
/// preserving single spaces inside a cell ("Anywhere on eth0").
fn split_columns(line: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut gap = 0usize;

    for ch in line.trim().chars() {
        if ch.is_whitespace() {
            gap += 1;
        } else {
            if !current.is_empty() {
                if gap >= 2 {
                    parts.push(std::mem::take(&mut current));
                } else if gap == 1 {
                    current.push(' ');
                }
            }
            gap = 0;
            current.push(ch);
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Positional binding for a fully separated row. An action cell of the form
/// "ALLOW IN" carries the direction annotation out into its own field.
fn bind_row(to: &str, action: &str, from: &str) -> RuleRecord {
    let mut record = RuleRecord::new(to, action, from);
    let tokens: Vec<&str> = action.split_whitespace().collect();
    if tokens.len() == 2 && (tokens[1] == "IN" || tokens[1] == "OUT") {
        record.action = tokens[0].to_string();
        record.direction = Some(tokens[1].to_string());
    }
    record
}
