//! # AT Response Parsers
//!
//! Pure functions: response text in, structured record or
//! [`ModemError::Parse`] out. Parsers accept the response with or without
//! a trailing `OK` and tolerate surrounding blank lines.

use cellmgr_common::bearer::{IpFamily, PdpContext};
use cellmgr_common::error::ModemError;
use cellmgr_common::network::{
    AccessTechnology, NetworkAvailability, NetworkInfo, RegistrationState,
};

// ─── Field Splitting ────────────────────────────────────────────────────────

/// A comma-separated field, remembering whether it was quoted.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Field {
    value: String,
    quoted: bool,
}

impl Field {
    fn as_u32(&self) -> Option<u32> {
        if self.quoted {
            return None;
        }
        self.value.parse().ok()
    }

    fn non_empty(&self) -> Option<String> {
        if self.value.is_empty() {
            None
        } else {
            Some(self.value.clone())
        }
    }
}

/// Split on commas outside double quotes. Quotes are stripped.
fn split_fields(input: &str) -> Result<Vec<Field>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            ',' if !in_quotes => {
                fields.push(Field {
                    value: current.trim().to_string(),
                    quoted,
                });
                current.clear();
                quoted = false;
            }
            _ => current.push(c),
        }
    }
    if in_quotes {
        return Err(format!("unterminated quote in '{input}'"));
    }
    fields.push(Field {
        value: current.trim().to_string(),
        quoted,
    });
    Ok(fields)
}

/// Lines of `response` carrying `prefix`, with the prefix removed.
fn prefixed_lines<'a>(response: &'a str, prefix: &'a str) -> impl Iterator<Item = &'a str> {
    response
        .lines()
        .map(str::trim)
        .filter_map(move |line| line.strip_prefix(prefix))
        .map(str::trim)
}

/// True for responses that carry no information lines at all.
fn is_blank(response: &str) -> bool {
    response
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line == "OK")
}

// ─── +CFUN? ─────────────────────────────────────────────────────────────────

/// Parse a `+CFUN?` response into the functionality mode.
///
/// Any numeric mode is returned; deciding which modes are acceptable is
/// the caller's business.
pub fn parse_cfun_query(response: &str) -> Result<u32, ModemError> {
    let line = prefixed_lines(response, "+CFUN:")
        .next()
        .ok_or_else(|| ModemError::parse(format!("no +CFUN: line in '{}'", response.trim())))?;
    let fields = split_fields(line).map_err(ModemError::parse)?;
    fields
        .first()
        .and_then(Field::as_u32)
        .ok_or_else(|| ModemError::parse(format!("invalid functionality mode in '{line}'")))
}

// ─── +CGDCONT? ──────────────────────────────────────────────────────────────

/// Parse a `+CGDCONT?` response into the list of defined PDP contexts.
///
/// An empty (or bare `OK`) response is an empty list. Lines that don't
/// parse are skipped; the response is an error only when no line yields a
/// context.
pub fn parse_cgdcont_query(response: &str) -> Result<Vec<PdpContext>, ModemError> {
    if is_blank(response) {
        return Ok(Vec::new());
    }

    let mut contexts = Vec::new();
    for line in prefixed_lines(response, "+CGDCONT:") {
        match parse_cgdcont_line(line) {
            Ok(context) => contexts.push(context),
            Err(e) => tracing::debug!(error = %e, "skipping context definition"),
        }
    }

    if contexts.is_empty() {
        return Err(ModemError::parse(format!(
            "no valid +CGDCONT: lines in '{}'",
            response.trim()
        )));
    }
    Ok(contexts)
}

fn parse_cgdcont_line(line: &str) -> Result<PdpContext, ModemError> {
    let fields = split_fields(line).map_err(ModemError::parse)?;
    let cid = fields
        .first()
        .and_then(Field::as_u32)
        .ok_or_else(|| ModemError::parse(format!("invalid context id in '{line}'")))?;
    let pdp_type = fields
        .get(1)
        .ok_or_else(|| ModemError::parse(format!("missing PDP type in '{line}'")))?;
    Ok(PdpContext {
        cid,
        ip_family: IpFamily::from_pdp_type(&pdp_type.value),
        apn: fields.get(2).and_then(Field::non_empty),
    })
}

// ─── +COPS=? ────────────────────────────────────────────────────────────────

/// Parse a `+COPS=?` network scan response.
///
/// Network tuples are listed first; the supported-modes and formats lists
/// follow after an empty element (`,,`) and are ignored.
pub fn parse_cops_test(response: &str) -> Result<Vec<NetworkInfo>, ModemError> {
    let body = prefixed_lines(response, "+COPS:")
        .next()
        .ok_or_else(|| ModemError::parse(format!("no +COPS: line in '{}'", response.trim())))?;

    let mut networks = Vec::new();
    for group in tuples(body)? {
        let fields = split_fields(group).map_err(ModemError::parse)?;
        // Mode/format ranges are unquoted; network tuples quote the names.
        if fields.len() < 4 || !fields[1].quoted {
            break;
        }
        let stat = fields[0]
            .as_u32()
            .ok_or_else(|| ModemError::parse(format!("invalid network status in '({group})'")))?;
        let access_technology = fields
            .get(4)
            .and_then(Field::as_u32)
            .map(AccessTechnology::from_act)
            .unwrap_or_default();
        networks.push(NetworkInfo {
            operator_code: fields[3].value.clone(),
            operator_long: fields[1].non_empty(),
            operator_short: fields[2].non_empty(),
            access_technology,
            availability: NetworkAvailability::from_stat(stat),
        });
    }
    Ok(networks)
}

/// Contents of each top-level `( … )` group, up to the first empty element.
fn tuples(body: &str) -> Result<Vec<&str>, ModemError> {
    let mut out = Vec::new();
    let mut start = None;
    let mut in_quotes = false;
    let mut separators = 0;

    for (i, c) in body.char_indices() {
        match c {
            '"' if start.is_some() => in_quotes = !in_quotes,
            '(' if !in_quotes && start.is_none() => {
                start = Some(i + 1);
                separators = 0;
            }
            ')' if !in_quotes => {
                let open = start
                    .take()
                    .ok_or_else(|| ModemError::parse(format!("unbalanced ')' in '{body}'")))?;
                out.push(&body[open..i]);
            }
            ',' if start.is_none() => {
                separators += 1;
                if separators > 1 {
                    break;
                }
            }
            _ => {}
        }
    }
    if start.is_some() {
        return Err(ModemError::parse(format!("unbalanced '(' in '{body}'")));
    }
    Ok(out)
}

// ─── +CREG? ─────────────────────────────────────────────────────────────────

/// Parse a `+CREG?` (or `+CGREG?` / `+CEREG?`) response.
pub fn parse_creg_query(response: &str) -> Result<RegistrationState, ModemError> {
    let line = ["+CREG:", "+CGREG:", "+CEREG:"]
        .iter()
        .find_map(|prefix| prefixed_lines(response, prefix).next())
        .ok_or_else(|| {
            ModemError::parse(format!("no registration line in '{}'", response.trim()))
        })?;
    let fields = split_fields(line).map_err(ModemError::parse)?;

    // Solicited form is `<n>,<stat>[,...]`; the unsolicited one starts with
    // `<stat>` followed by quoted location fields.
    let stat = match fields.get(1).and_then(Field::as_u32) {
        Some(stat) => Some(stat),
        None => fields.first().and_then(Field::as_u32),
    };
    stat.map(RegistrationState::from_stat)
        .ok_or_else(|| ModemError::parse(format!("invalid registration status in '{line}'")))
}

// ─── Quoting ────────────────────────────────────────────────────────────────

/// Quote a string argument for an AT command, escaping `"` and `\` as
/// `\22` and `\5C`.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\22"),
            '\\' => out.push_str("\\5C"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use cellmgr_common::error::ErrorKind;

    use super::*;

    // ─── +CFUN? ─────────────────────────────────────────────────────────

    #[test]
    fn cfun_plain_and_with_ok() {
        assert_eq!(parse_cfun_query("+CFUN: 1").unwrap(), 1);
        assert_eq!(parse_cfun_query("\r\n+CFUN: 4,0\r\n\r\nOK\r\n").unwrap(), 4);
    }

    #[test]
    fn cfun_unexpected_mode_is_still_parsed() {
        assert_eq!(parse_cfun_query("+CFUN: 0").unwrap(), 0);
        assert_eq!(parse_cfun_query("+CFUN: 7").unwrap(), 7);
    }

    #[test]
    fn cfun_malformed_is_parse_error() {
        for bad in ["", "OK", "+CFUN: x", "+CFUN:", "garbage"] {
            let err = parse_cfun_query(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Parse, "input {bad:?}");
        }
    }

    // ─── +CGDCONT? ──────────────────────────────────────────────────────

    #[test]
    fn cgdcont_lists_contexts_in_order() {
        let response = "+CGDCONT: 1,\"IP\",\"internet\",\"0.0.0.0\",0,0\r\n\
                        +CGDCONT: 3,\"IPV4V6\",\"\",\"\",0,0\r\n\
                        OK";
        let contexts = parse_cgdcont_query(response).unwrap();
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].cid, 1);
        assert_eq!(contexts[0].ip_family, IpFamily::Ipv4);
        assert_eq!(contexts[0].apn.as_deref(), Some("internet"));
        assert_eq!(contexts[1].cid, 3);
        assert_eq!(contexts[1].ip_family, IpFamily::Ipv4v6);
        assert_eq!(contexts[1].apn, None);
    }

    #[test]
    fn cgdcont_apn_with_comma() {
        let contexts = parse_cgdcont_query("+CGDCONT: 2,\"IPV6\",\"a,b\"").unwrap();
        assert_eq!(contexts[0].apn.as_deref(), Some("a,b"));
    }

    #[test]
    fn cgdcont_empty_response_is_empty_list() {
        assert!(parse_cgdcont_query("").unwrap().is_empty());
        assert!(parse_cgdcont_query("\r\nOK\r\n").unwrap().is_empty());
    }

    #[test]
    fn cgdcont_malformed_is_parse_error() {
        for bad in ["+CGDCONT: x,\"IP\"", "+CGDCONT: 1", "bogus", "+CGDCONT: 1,\"IP"] {
            assert_eq!(
                parse_cgdcont_query(bad).unwrap_err().kind(),
                ErrorKind::Parse,
                "input {bad:?}"
            );
        }
    }

    #[test]
    fn cgdcont_skips_malformed_lines() {
        let response = "+CGDCONT: 1,\"IP\",\"internet\"\r\n\
                        +CGDCONT: ,\"IP\",\"\"\r\n\
                        +CGDCONT: 3,\"IPV6\r\n\
                        OK";
        let contexts = parse_cgdcont_query(response).unwrap();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].cid, 1);
        assert_eq!(contexts[0].apn.as_deref(), Some("internet"));
    }

    // ─── +COPS=? ────────────────────────────────────────────────────────

    #[test]
    fn cops_scan_stops_at_mode_lists() {
        let response = "+COPS: (2,\"Vodafone ES\",\"voda\",\"21401\",7),\
                        (1,\"Orange\",\"\",\"21403\",2),\
                        (3,\"\",\"\",\"21404\"),,(0,1,2,3,4),(0,1,2)\r\nOK";
        let nets = parse_cops_test(response).unwrap();
        assert_eq!(nets.len(), 3);
        assert_eq!(nets[0].operator_code, "21401");
        assert_eq!(nets[0].availability, NetworkAvailability::Current);
        assert_eq!(nets[0].access_technology, AccessTechnology::Lte);
        assert_eq!(nets[1].operator_short, None);
        assert_eq!(nets[1].access_technology, AccessTechnology::Umts);
        assert_eq!(nets[2].operator_long, None);
        assert_eq!(nets[2].access_technology, AccessTechnology::Unknown);
        assert_eq!(nets[2].availability, NetworkAvailability::Forbidden);
    }

    #[test]
    fn cops_scan_with_no_networks() {
        assert!(parse_cops_test("+COPS: ,,(0,1,2,3,4),(0,1,2)").unwrap().is_empty());
    }

    #[test]
    fn cops_malformed_is_parse_error() {
        assert!(parse_cops_test("OK").is_err());
        assert!(parse_cops_test("+COPS: (2,\"A\",\"B\",\"1\"").is_err());
        assert!(parse_cops_test("+COPS: (x,\"A\",\"B\",\"21401\")").is_err());
    }

    // ─── +CREG? ─────────────────────────────────────────────────────────

    #[test]
    fn creg_solicited_and_unsolicited_forms() {
        assert_eq!(parse_creg_query("+CREG: 0,1").unwrap(), RegistrationState::Home);
        assert_eq!(
            parse_creg_query("+CREG: 2,5,\"00C3\",\"0001A2B4\",7\r\nOK").unwrap(),
            RegistrationState::Roaming
        );
        assert_eq!(
            parse_creg_query("+CEREG: 2,\"00C3\",\"A2B4\"").unwrap(),
            RegistrationState::Searching
        );
    }

    #[test]
    fn creg_malformed_is_parse_error() {
        assert!(parse_creg_query("+CREG:").is_err());
        assert!(parse_creg_query("OK").is_err());
    }

    // ─── Quoting ────────────────────────────────────────────────────────

    #[test]
    fn quote_escapes_quote_and_backslash() {
        assert_eq!(quote_string("internet"), "\"internet\"");
        assert_eq!(quote_string(""), "\"\"");
        assert_eq!(quote_string("a\"b\\c"), "\"a\\22b\\5Cc\"");
    }
}
