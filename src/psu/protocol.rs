use core::fmt;
use core::str::FromStr;

/// Command issued to the power source. The canonical wire form is
/// upper-case ASCII; parsing accepts any case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PsuCommand {
    /// Set voltage/current setpoints; must precede an output enable.
    Apply { voltage_v: f64, current_a: f64 },
    OutputOn,
    OutputOff,
}

impl fmt::Display for PsuCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PsuCommand::Apply {
                voltage_v,
                current_a,
            } => write!(f, "APPLY {:.2} {:.3}", voltage_v, current_a),
            PsuCommand::OutputOn => write!(f, "OUTP ON"),
            PsuCommand::OutputOff => write!(f, "OUTP OFF"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCommandError(String);

impl fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized PSU command: {}", self.0)
    }
}

impl std::error::Error for ParseCommandError {}

impl FromStr for PsuCommand {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical = s.trim().to_uppercase();
        let tokens: Vec<&str> = canonical.split_whitespace().collect();
        match tokens.as_slice() {
            ["OUTP", "ON"] => Ok(PsuCommand::OutputOn),
            ["OUTP", "OFF"] => Ok(PsuCommand::OutputOff),
            ["APPLY", voltage, current] => {
                match (voltage.parse::<f64>(), current.parse::<f64>()) {
                    (Ok(voltage_v), Ok(current_a)) => Ok(PsuCommand::Apply {
                        voltage_v,
                        current_a,
                    }),
                    _ => Err(ParseCommandError(s.trim().to_string())),
                }
            }
            _ => Err(ParseCommandError(s.trim().to_string())),
        }
    }
}

/// Status token reported by the instrument alongside measurements.
#[derive(Debug, Clone, PartialEq)]
pub enum PsuStatus {
    PlatingActive,
    OutputOff,
    NotConnected,
    /// Device-internal error while communication is otherwise healthy.
    Alert(String),
    CommsError,
    ReadFail,
}

impl PsuStatus {
    pub fn is_alert(&self) -> bool {
        matches!(self, PsuStatus::Alert(_))
    }

    /// Loss of the instrument session, as opposed to one bad reading.
    pub fn is_comms_failure(&self) -> bool {
        matches!(self, PsuStatus::CommsError)
    }

    /// Matches a raw status line against the known vocabulary.
    ///
    /// Matching is by substring so decorated forms like
    /// `ALERT: PSU Error (...)` resolve to their family token.
    pub fn from_token(token: &str) -> Option<PsuStatus> {
        let upper = token.trim().to_uppercase();
        if upper.contains("COMMS ERROR") {
            return Some(PsuStatus::CommsError);
        }
        if upper.contains("ALERT") {
            let detail = token
                .splitn(2, ':')
                .nth(1)
                .map(|d| d.trim().to_string())
                .unwrap_or_else(|| token.trim().to_string());
            return Some(PsuStatus::Alert(detail));
        }
        if upper.contains("MEASUREMENT READ FAIL") {
            return Some(PsuStatus::ReadFail);
        }
        if upper.contains("NOT CONNECTED") {
            return Some(PsuStatus::NotConnected);
        }
        if upper.contains("OUTPUT OFF") {
            return Some(PsuStatus::OutputOff);
        }
        if upper.contains("PLATING ACTIVE") {
            return Some(PsuStatus::PlatingActive);
        }
        None
    }
}

impl fmt::Display for PsuStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PsuStatus::PlatingActive => write!(f, "PLATING ACTIVE"),
            PsuStatus::OutputOff => write!(f, "OUTPUT OFF (Connected)"),
            PsuStatus::NotConnected => write!(f, "NOT CONNECTED"),
            PsuStatus::Alert(detail) => write!(f, "ALERT: {}", detail),
            PsuStatus::CommsError => write!(f, "COMMS ERROR - PSU OFFLINE"),
            PsuStatus::ReadFail => write!(f, "MEASUREMENT READ FAIL"),
        }
    }
}
