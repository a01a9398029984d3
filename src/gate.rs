use crate::error::{Error, Result};
use crate::types::Risk;
use std::io;

/// Asks the operator a yes/no question.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

/// One-shot check before anything runs.
///
/// `High` always needs `auto_approve`. Otherwise a risk at or above the
/// threshold prompts once unless `auto_approve` is set; an unreadable or
/// negative answer aborts.
pub fn check(
    risk: Risk,
    threshold: Risk,
    auto_approve: bool,
    confirm: &mut dyn Confirm,
    prompt: &str,
) -> Result<()> {
    if risk == Risk::High {
        return if auto_approve {
            log::debug!("gate: high risk auto-approved");
            Ok(())
        } else {
            Err(Error::HighRiskBlocked)
        };
    }

    if risk < threshold || auto_approve {
        return Ok(());
    }

    match confirm.confirm(prompt) {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::Aborted),
        Err(e) => {
            log::warn!("confirmation unreadable: {}", e);
            Err(Error::Aborted)
        }
    }
}
