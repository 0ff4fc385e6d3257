//! Relay pins driven through the Raspberry Pi `pinctrl` tool.

use std::ffi::OsString;
use std::future::Future;

use tokio::process::Command;

use hvac_app::ports::PinDriver;
use hvac_domain::error::HvacError;
use hvac_domain::pin::GpioPin;

use crate::error::GpioError;

/// Shells out to `pinctrl` for every write and level read.
#[derive(Debug, Clone)]
pub struct PinctrlDriver {
    program: OsString,
}

impl Default for PinctrlDriver {
    fn default() -> Self {
        Self::new("pinctrl")
    }
}

impl PinctrlDriver {
    /// Use `program` instead of `pinctrl` found on `PATH`.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[String]) -> Result<String, GpioError> {
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(GpioError::Spawn)?;
        if !output.status.success() {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(GpioError::Command {
                args: args.join(" "),
                output: text.trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Configure `pin` as a push-pull output driven to `level`.
    async fn drive(&self, number: u8, level: bool) -> Result<(), GpioError> {
        let drive = if level { "dh" } else { "dl" };
        let args = ["set".to_string(), number.to_string(), "op".into(), "pn".into(), drive.into()];
        self.run(&args).await?;
        tracing::debug!(pin = number, drive, "pin driven");
        Ok(())
    }
}

/// Parse the output of `pinctrl lev <n>`.
fn parse_level(output: &str) -> Result<bool, GpioError> {
    match output.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(GpioError::UnexpectedLevel(other.to_string())),
    }
}

impl PinDriver for PinctrlDriver {
    fn activate(&self, pin: GpioPin) -> impl Future<Output = Result<(), HvacError>> + Send {
        async move { Ok(self.drive(pin.number, pin.level_for(true)).await?) }
    }

    fn deactivate(&self, pin: GpioPin) -> impl Future<Output = Result<(), HvacError>> + Send {
        async move { Ok(self.drive(pin.number, pin.level_for(false)).await?) }
    }

    fn read_level(&self, number: u8) -> impl Future<Output = Result<bool, HvacError>> + Send {
        async move {
            let output = self.run(&["lev".to_string(), number.to_string()]).await?;
            Ok(parse_level(&output)?)
        }
    }
}
