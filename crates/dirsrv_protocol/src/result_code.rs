//! LDAP result codes.

use std::fmt;

/// An LDAP result code (RFC 4511 §4.1.9).
///
/// Codes produced by backends that have no named variant are carried
/// through verbatim as [`ResultCode::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// 0
    Success,
    /// 1
    OperationsError,
    /// 2
    ProtocolError,
    /// 3
    TimeLimitExceeded,
    /// 4
    SizeLimitExceeded,
    /// 7
    AuthMethodNotSupported,
    /// 10
    Referral,
    /// 12
    UnavailableCriticalExtension,
    /// 16
    NoSuchAttribute,
    /// 19
    ConstraintViolation,
    /// 20
    AttributeOrValueExists,
    /// 32
    NoSuchObject,
    /// 34
    InvalidDnSyntax,
    /// 49
    InvalidCredentials,
    /// 50
    InsufficientAccessRights,
    /// 51
    Busy,
    /// 52
    Unavailable,
    /// 53
    UnwillingToPerform,
    /// 66
    NotAllowedOnNonLeaf,
    /// 67
    NotAllowedOnRdn,
    /// 68
    EntryAlreadyExists,
    /// 80
    Other,
    /// Any code without a named variant.
    Unknown(u32),
}

impl ResultCode {
    /// Converts to the numeric wire code.
    pub fn to_code(self) -> u32 {
        match self {
            ResultCode::Success => 0,
            ResultCode::OperationsError => 1,
            ResultCode::ProtocolError => 2,
            ResultCode::TimeLimitExceeded => 3,
            ResultCode::SizeLimitExceeded => 4,
            ResultCode::AuthMethodNotSupported => 7,
            ResultCode::Referral => 10,
            ResultCode::UnavailableCriticalExtension => 12,
            ResultCode::NoSuchAttribute => 16,
            ResultCode::ConstraintViolation => 19,
            ResultCode::AttributeOrValueExists => 20,
            ResultCode::NoSuchObject => 32,
            ResultCode::InvalidDnSyntax => 34,
            ResultCode::InvalidCredentials => 49,
            ResultCode::InsufficientAccessRights => 50,
            ResultCode::Busy => 51,
            ResultCode::Unavailable => 52,
            ResultCode::UnwillingToPerform => 53,
            ResultCode::NotAllowedOnNonLeaf => 66,
            ResultCode::NotAllowedOnRdn => 67,
            ResultCode::EntryAlreadyExists => 68,
            ResultCode::Other => 80,
            ResultCode::Unknown(code) => code,
        }
    }

    /// Converts from a numeric wire code.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => ResultCode::Success,
            1 => ResultCode::OperationsError,
            2 => ResultCode::ProtocolError,
            3 => ResultCode::TimeLimitExceeded,
            4 => ResultCode::SizeLimitExceeded,
            7 => ResultCode::AuthMethodNotSupported,
            10 => ResultCode::Referral,
            12 => ResultCode::UnavailableCriticalExtension,
            16 => ResultCode::NoSuchAttribute,
            19 => ResultCode::ConstraintViolation,
            20 => ResultCode::AttributeOrValueExists,
            32 => ResultCode::NoSuchObject,
            34 => ResultCode::InvalidDnSyntax,
            49 => ResultCode::InvalidCredentials,
            50 => ResultCode::InsufficientAccessRights,
            51 => ResultCode::Busy,
            52 => ResultCode::Unavailable,
            53 => ResultCode::UnwillingToPerform,
            66 => ResultCode::NotAllowedOnNonLeaf,
            67 => ResultCode::NotAllowedOnRdn,
            68 => ResultCode::EntryAlreadyExists,
            80 => ResultCode::Other,
            other => ResultCode::Unknown(other),
        }
    }

    /// Returns true for `Success`.
    pub fn is_success(self) -> bool {
        self == ResultCode::Success
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResultCode::Success => "success",
            ResultCode::OperationsError => "operationsError",
            ResultCode::ProtocolError => "protocolError",
            ResultCode::TimeLimitExceeded => "timeLimitExceeded",
            ResultCode::SizeLimitExceeded => "sizeLimitExceeded",
            ResultCode::AuthMethodNotSupported => "authMethodNotSupported",
            ResultCode::Referral => "referral",
            ResultCode::UnavailableCriticalExtension => "unavailableCriticalExtension",
            ResultCode::NoSuchAttribute => "noSuchAttribute",
            ResultCode::ConstraintViolation => "constraintViolation",
            ResultCode::AttributeOrValueExists => "attributeOrValueExists",
            ResultCode::NoSuchObject => "noSuchObject",
            ResultCode::InvalidDnSyntax => "invalidDNSyntax",
            ResultCode::InvalidCredentials => "invalidCredentials",
            ResultCode::InsufficientAccessRights => "insufficientAccessRights",
            ResultCode::Busy => "busy",
            ResultCode::Unavailable => "unavailable",
            ResultCode::UnwillingToPerform => "unwillingToPerform",
            ResultCode::NotAllowedOnNonLeaf => "notAllowedOnNonLeaf",
            ResultCode::NotAllowedOnRdn => "notAllowedOnRDN",
            ResultCode::EntryAlreadyExists => "entryAlreadyExists",
            ResultCode::Other => "other",
            ResultCode::Unknown(code) => return write!(f, "code {code}"),
        };
        write!(f, "{name} ({})", self.to_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_code_numbers() {
        assert_eq!(ResultCode::Success.to_code(), 0);
        assert_eq!(ResultCode::Referral.to_code(), 10);
        assert_eq!(ResultCode::InvalidDnSyntax.to_code(), 34);
        assert_eq!(ResultCode::UnwillingToPerform.to_code(), 53);

        assert_eq!(ResultCode::from_code(19), ResultCode::ConstraintViolation);
        assert_eq!(ResultCode::from_code(68), ResultCode::EntryAlreadyExists);
    }

    #[test]
    fn unknown_codes_pass_through() {
        let code = ResultCode::from_code(4096);
        assert_eq!(code, ResultCode::Unknown(4096));
        assert_eq!(code.to_code(), 4096);
    }

    #[test]
    fn display_includes_number() {
        assert_eq!(ResultCode::ProtocolError.to_string(), "protocolError (2)");
    }
}
