use super::*;

#[derive(Clone, Default)]
pub struct SBError {
    error: Option<WatchError>,
}

impl SBError {
    pub fn new() -> SBError {
        SBError { error: None }
    }
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
    pub fn error(&self) -> Option<&WatchError> {
        self.error.as_ref()
    }
    pub fn error_string(&self) -> String {
        match &self.error {
            Some(err) => err.to_string(),
            None => String::new(),
        }
    }
    pub fn into_result(self) -> Result<(), SBError> {
        if self.is_failure() {
            Err(self)
        } else {
            Ok(())
        }
    }
}

impl From<WatchError> for SBError {
    fn from(err: WatchError) -> SBError {
        SBError { error: Some(err) }
    }
}

impl IsValid for SBError {
    fn is_valid(&self) -> bool {
        self.error.is_some()
    }
}

impl fmt::Debug for SBError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error {
            Some(err) => write!(f, "error: {}", err),
            None => write!(f, "success"),
        }
    }
}

impl fmt::Display for SBError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.error_string())
    }
}

impl std::error::Error for SBError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.as_ref().map(|err| err as &(dyn std::error::Error + 'static))
    }
}

#[test]
fn test_success_and_failure() {
    let ok = SBError::new();
    assert!(ok.is_success());
    assert!(ok.clone().check().is_none());
    assert_eq!(ok.error_string(), "");
    assert!(ok.into_result().is_ok());

    let err = SBError::from(WatchError::NoFreeHardwareSlot);
    assert!(!err.is_success());
    assert!(std::error::Error::source(&err).is_some());
    let err = err.check().unwrap();
    assert_eq!(format!("{:?}", err), format!("error: {}", err));
    assert_eq!(err.into_result().unwrap_err().error(), Some(&WatchError::NoFreeHardwareSlot));
}
