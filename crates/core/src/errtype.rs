//! The fixed exception-kind enum carried across the runtime helper ABI.

/// `Errtype` from the runtime helper ABI: the second argument to
/// `__throwError(cstr, errtype)`. Discriminants are part of the ABI
/// contract with compiled code and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrType {
    SyntaxError = 0,
    TypeError = 1,
    ReferenceError = 2,
    RangeError = 3,
    InternalError = 4,
}

impl ErrType {
    pub fn from_i32(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(ErrType::SyntaxError),
            1 => Some(ErrType::TypeError),
            2 => Some(ErrType::ReferenceError),
            3 => Some(ErrType::RangeError),
            4 => Some(ErrType::InternalError),
            _ => None,
        }
    }
}

impl std::fmt::Display for ErrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrType::SyntaxError => "SyntaxError",
            ErrType::TypeError => "TypeError",
            ErrType::ReferenceError => "ReferenceError",
            ErrType::RangeError => "RangeError",
            ErrType::InternalError => "InternalError",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_match_the_abi_table() {
        assert_eq!(ErrType::SyntaxError as i32, 0);
        assert_eq!(ErrType::TypeError as i32, 1);
        assert_eq!(ErrType::ReferenceError as i32, 2);
        assert_eq!(ErrType::RangeError as i32, 3);
        assert_eq!(ErrType::InternalError as i32, 4);
    }

    #[test]
    fn round_trips_through_i32() {
        for v in 0..5 {
            assert_eq!(ErrType::from_i32(v).unwrap() as i32, v);
        }
        assert!(ErrType::from_i32(5).is_none());
    }
}
