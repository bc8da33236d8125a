use std::path::PathBuf;

use crate::matcher::FilterCriteria;

const URI_SCHEME: &str = "wellview://";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchRequest {
    pub directory: Option<PathBuf>,
    pub criteria: FilterCriteria,
}

impl LaunchRequest {
    fn is_empty(&self) -> bool {
        self.directory.is_none() && self.criteria == FilterCriteria::default()
    }
}

pub fn parse_launch_request_from_args(args: &[String]) -> Result<Option<LaunchRequest>, String> {
    if args.is_empty() {
        return Ok(None);
    }

    if args.len() == 1 && is_wellview_uri(&args[0]) {
        return parse_wellview_uri(&args[0]).map(Some);
    }

    let mut request = LaunchRequest::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let flag = arg.as_str();
        let slot = match flag {
            "--dir" | "--directory" => None,
            "--experiment" => Some(&mut request.criteria.experiment),
            "--plate" => Some(&mut request.criteria.plate),
            "--patient" | "--patient-code" => Some(&mut request.criteria.patient_code),
            "--stage" => Some(&mut request.criteria.stage),
            other if other.starts_with("--") => {
                return Err(format!("Unknown option {other}."));
            }
            positional => {
                if request.directory.is_some() {
                    return Err(format!("Unexpected extra argument {positional}."));
                }
                request.directory = Some(PathBuf::from(positional));
                continue;
            }
        };

        let Some(value) = iter.next() else {
            return Err(format!("Missing value after {flag}."));
        };
        match slot {
            Some(field) => *field = value.trim().to_string(),
            None => request.directory = Some(PathBuf::from(value)),
        }
    }

    Ok(Some(request))
}

pub fn is_wellview_uri(value: &str) -> bool {
    strip_wellview_scheme(value).is_some()
}

pub fn parse_wellview_uri(uri: &str) -> Result<LaunchRequest, String> {
    let rest = strip_wellview_scheme(uri)
        .ok_or_else(|| "URL must start with wellview://".to_string())?;

    let (location, query) = split_location_and_query(rest);
    let mut request = LaunchRequest {
        directory: parse_location_path(location)?.map(PathBuf::from),
        ..LaunchRequest::default()
    };

    if let Some(query_string) = query {
        for pair in query_string.split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = key.trim().to_ascii_lowercase();
            let decoded_value = percent_decode(value)?;
            let trimmed = decoded_value.trim();
            match key.as_str() {
                "dir" | "directory" | "path" => {
                    if !trimmed.is_empty() {
                        request.directory = Some(PathBuf::from(trimmed));
                    }
                }
                "experiment" | "exp" => request.criteria.experiment = trimmed.to_string(),
                "plate" => request.criteria.plate = trimmed.to_string(),
                "patient" | "patient_code" | "patientcode" => {
                    request.criteria.patient_code = trimmed.to_string()
                }
                "stage" => request.criteria.stage = trimmed.to_string(),
                _ => {}
            }
        }
    }

    if request.is_empty() {
        return Err("URL selects nothing. Use dir=..., experiment=..., plate=...".to_string());
    }
    Ok(request)
}

fn strip_wellview_scheme(uri: &str) -> Option<&str> {
    uri.get(..URI_SCHEME.len())
        .filter(|head| head.eq_ignore_ascii_case(URI_SCHEME))
        .and_then(|_| uri.get(URI_SCHEME.len()..))
}

fn split_location_and_query(value: &str) -> (&str, Option<&str>) {
    if let Some((location, query)) = value.split_once('?') {
        (location, Some(query))
    } else {
        (value, None)
    }
}

fn parse_location_path(location: &str) -> Result<Option<String>, String> {
    let location = location.trim();
    if location.is_empty() || location == "/" {
        return Ok(None);
    }

    let lower = location.to_ascii_lowercase();
    if lower == "open" {
        return Ok(None);
    }

    if lower.starts_with("open/") {
        let decoded = percent_decode(&location[5..])?;
        if decoded.trim().is_empty() {
            return Ok(None);
        }
        return Ok(Some(decoded));
    }

    Ok(Some(percent_decode(location)?))
}

fn percent_decode(value: &str) -> Result<String, String> {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'+' => {
                decoded.push(b' ');
                index += 1;
            }
            b'%' => {
                if index + 2 >= bytes.len() {
                    return Err("Invalid percent-encoding in URL.".to_string());
                }
                let hi = decode_hex_digit(bytes[index + 1])
                    .ok_or_else(|| "Invalid percent-encoding in URL.".to_string())?;
                let lo = decode_hex_digit(bytes[index + 2])
                    .ok_or_else(|| "Invalid percent-encoding in URL.".to_string())?;
                decoded.push((hi << 4) | lo);
                index += 3;
            }
            byte => {
                decoded.push(byte);
                index += 1;
            }
        }
    }

    String::from_utf8(decoded).map_err(|_| "URL contains invalid UTF-8 after decoding.".to_string())
}

fn decode_hex_digit(value: u8) -> Option<u8> {
    match value {
        b'0'..=b'9' => Some(value - b'0'),
        b'a'..=b'f' => Some(value - b'a' + 10),
        b'A'..=b'F' => Some(value - b'A' + 10),
        _ => None,
    }
}
