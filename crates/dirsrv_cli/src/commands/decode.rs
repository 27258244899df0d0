//! Decode command implementation.

use dirsrv_protocol::request::{abandon_id, delete_dn};
use dirsrv_protocol::{
    AddRequest, Authentication, BindRequest, FrameBuffer, LdapMessage, ModifyRequest,
    OperationKind, Response, SearchRequest, DEFAULT_MAX_FRAME_SIZE,
};
use serde::Serialize;

/// A decoded frame for output.
#[derive(Debug, Serialize)]
pub struct FrameInfo {
    /// Message id.
    pub message_id: i64,
    /// Operation or response name.
    pub operation: String,
    /// Target or bind DN, if the operation has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dn: Option<String>,
    /// Result code of a response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Attached controls as `oid` or `oid (critical)`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<String>,
    /// Operation-specific detail lines.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl FrameInfo {
    fn new(message_id: i64, operation: impl Into<String>) -> Self {
        Self {
            message_id,
            operation: operation.into(),
            dn: None,
            result: None,
            controls: Vec::new(),
            details: Vec::new(),
        }
    }
}

/// Runs the decode command.
pub fn run(input: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let frames = decode_all(input)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&frames)?);
        }
        _ => {
            print_text_output(&frames);
        }
    }

    Ok(())
}

/// Splits hex input into frames and decodes each one.
pub fn decode_all(input: &str) -> Result<Vec<FrameInfo>, Box<dyn std::error::Error>> {
    let cleaned: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = hex::decode(cleaned)?;

    let mut buffer = FrameBuffer::new(DEFAULT_MAX_FRAME_SIZE);
    buffer.extend(&bytes);
    let mut frames = Vec::new();
    while let Some(frame) = buffer.next_frame()? {
        frames.push(describe(&frame)?);
    }
    if buffer.buffered() > 0 {
        return Err(format!("{} trailing bytes after the last frame", buffer.buffered()).into());
    }
    Ok(frames)
}

/// Decodes one frame, as a request first and then as a response.
pub fn describe(frame: &[u8]) -> Result<FrameInfo, Box<dyn std::error::Error>> {
    match LdapMessage::decode(frame) {
        Ok(message) => describe_request(&message),
        Err(request_err) => match Response::decode(frame) {
            Ok((id, response)) => Ok(describe_response(id, &response)),
            Err(_) => Err(request_err.into()),
        },
    }
}

fn describe_request(message: &LdapMessage<'_>) -> Result<FrameInfo, Box<dyn std::error::Error>> {
    let mut info = FrameInfo::new(message.message_id, message.kind.name());
    info.controls = message
        .controls()?
        .into_iter()
        .map(|c| {
            if c.critical {
                format!("{} (critical)", c.oid)
            } else {
                c.oid
            }
        })
        .collect();

    match message.kind {
        OperationKind::Add => {
            let request = AddRequest::decode(message.op)?;
            info.dn = Some(request.name.to_string());
            for attribute in request.attributes()? {
                let attribute = attribute?;
                info.details.push(format!(
                    "{}: {} value(s)",
                    attribute.attr_type,
                    attribute.values.len()
                ));
            }
        }
        OperationKind::Modify => {
            let request = ModifyRequest::decode(message.op)?;
            info.dn = Some(request.object);
            for change in &request.changes {
                info.details.push(format!(
                    "{:?} {}: {} value(s)",
                    change.operation,
                    change.attr_type,
                    change.values.len()
                ));
            }
        }
        OperationKind::Delete => {
            info.dn = Some(delete_dn(message.op)?.to_string());
        }
        OperationKind::Search => {
            let request = SearchRequest::decode(message.op)?;
            info.dn = Some(request.base);
            info.details.push(format!("scope: {:?}", request.scope));
            info.details.push(format!("filter: {:?}", request.filter));
            info.details.push(format!(
                "limits: size={} time={}",
                request.size_limit, request.time_limit
            ));
            if !request.attributes.is_empty() {
                info.details
                    .push(format!("attributes: {}", request.attributes.join(", ")));
            }
        }
        OperationKind::Bind => {
            let request = BindRequest::decode(message.op)?;
            info.dn = Some(request.name);
            info.details.push(format!("version: {}", request.version));
            let method = match request.authentication {
                Authentication::Simple(_) => "simple".to_string(),
                Authentication::Sasl { mechanism, .. } => format!("sasl {mechanism}"),
                Authentication::Unsupported(tag) => format!("unsupported {tag}"),
            };
            info.details.push(format!("method: {method}"));
        }
        OperationKind::Abandon => {
            info.details
                .push(format!("abandon: {}", abandon_id(message.op)?));
        }
        _ => {}
    }
    Ok(info)
}

fn describe_response(message_id: i64, response: &Response) -> FrameInfo {
    let name = match response {
        Response::Bind(_) => "bindResponse",
        Response::Add(_) => "addResponse",
        Response::Modify(_) => "modifyResponse",
        Response::Delete(_) => "delResponse",
        Response::ModifyDn(_) => "modDNResponse",
        Response::Compare(_) => "compareResponse",
        Response::SearchEntry(_) => "searchResEntry",
        Response::SearchDone(_) => "searchResDone",
        Response::Extended { .. } => "extendedResp",
    };
    let mut info = FrameInfo::new(message_id, name);

    if let Response::SearchEntry(entry) = response {
        info.dn = Some(entry.dn.clone());
        info.details = entry
            .attributes
            .iter()
            .map(|(attr_type, values)| format!("{attr_type}: {} value(s)", values.len()))
            .collect();
    }
    if let Some(result) = response.result() {
        info.result = Some(result.code.to_string());
        if !result.matched_dn.is_empty() {
            info.dn = Some(result.matched_dn.clone());
        }
        if !result.message.is_empty() {
            info.details.push(format!("message: {}", result.message));
        }
        info.details
            .extend(result.referrals.iter().map(|r| format!("referral: {r}")));
    }
    if let Response::Extended { name: Some(oid), .. } = response {
        info.details.push(format!("name: {oid}"));
    }
    info
}

fn print_text_output(frames: &[FrameInfo]) {
    println!("Frames ({} total)", frames.len());
    println!("================");
    println!();

    for frame in frames {
        print!("[{:>4}] {:16}", frame.message_id, frame.operation);
        if let Some(ref dn) = frame.dn {
            print!(" dn=\"{}\"", dn);
        }
        if let Some(ref result) = frame.result {
            print!(" result={}", result);
        }
        if !frame.controls.is_empty() {
            print!(" controls=[{}]", frame.controls.join(", "));
        }
        println!();
        for detail in &frame.details {
            println!("         {}", detail);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirsrv_protocol::{Control, LdapResult, Request, ResultCode};

    #[test]
    fn decode_request_frame() {
        let request = Request::Add {
            name: "cn=foo,dc=example,dc=com".into(),
            attributes: vec![("cn".into(), vec![b"foo".to_vec()])],
        };
        let frame = request.encode(4, &[Control::new("1.2.3", true, None)]);

        let info = describe(&frame).unwrap();
        assert_eq!(info.message_id, 4);
        assert_eq!(info.operation, OperationKind::Add.name());
        assert_eq!(info.dn.as_deref(), Some("cn=foo,dc=example,dc=com"));
        assert_eq!(info.controls, vec!["1.2.3 (critical)".to_string()]);
        assert_eq!(info.details, vec!["cn: 1 value(s)".to_string()]);
    }

    #[test]
    fn decode_response_frame() {
        let frame = Response::Add(LdapResult::new(ResultCode::NoSuchObject, "")
            .with_matched_dn("dc=example,dc=com"))
        .encode(9);

        let info = describe(&frame).unwrap();
        assert_eq!(info.operation, "addResponse");
        assert_eq!(info.result.as_deref(), Some("noSuchObject"));
        assert_eq!(info.dn.as_deref(), Some("dc=example,dc=com"));
    }

    #[test]
    fn decode_concatenated_hex() {
        let mut bytes = Request::Delete("cn=a".into()).encode(1, &[]);
        bytes.extend(Request::Unbind.encode(2, &[]));
        let spaced = hex::encode(&bytes)
            .as_bytes()
            .chunks(2)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join(" ");

        let frames = decode_all(&spaced).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].dn.as_deref(), Some("cn=a"));
        assert_eq!(frames[1].operation, OperationKind::Unbind.name());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_all("zz").is_err());
        assert!(decode_all("30 03 04 01 00").is_err());
        assert!(decode_all("30 05 02 01").is_err());
    }
}
