use boa_engine::{Context, JsResult, JsValue, Source};
use tracing::warn;

use crate::error::{CodepadError, Result};

/// Swaps `console` for an object whose methods append to a private buffer.
const INSTALL_CAPTURE: &str = r#"
(function (global) {
    var captured = [];
    var write = function () {
        captured.push(Array.prototype.join.call(arguments, " ") + "\n");
    };
    Object.defineProperty(global, "__codepad_captured", { value: captured, configurable: true });
    Object.defineProperty(global, "__codepad_previous_console", { value: global.console, configurable: true });
    global.console = { log: write, info: write, warn: write, error: write, debug: write };
})(globalThis);
"#;

const COLLECT_CAPTURE: &str = r#"globalThis.__codepad_captured.join("")"#;

const RESTORE_CONSOLE: &str = r#"
(function (global) {
    global.console = global.__codepad_previous_console;
    delete global.__codepad_previous_console;
    delete global.__codepad_captured;
})(globalThis);
"#;

/// Scoped capture of everything a script writes through `console`.
///
/// Installing the capture replaces the engine's `console` binding; the previous
/// binding is put back by [`OutputCapture::finish`] or, on any early return, by
/// `Drop`.
pub struct OutputCapture<'a> {
    context: &'a mut Context,
    installed: bool,
}

impl<'a> OutputCapture<'a> {
    pub fn install(context: &'a mut Context) -> Result<Self> {
        context
            .eval(Source::from_bytes(INSTALL_CAPTURE))
            .map_err(|e| CodepadError::Evaluation(format!("failed to capture console: {}", e)))?;

        Ok(Self {
            context,
            installed: true,
        })
    }

    /// Evaluate a script while the capture is active and return its completion value.
    pub fn eval(&mut self, source: &str) -> JsResult<JsValue> {
        self.context.eval(Source::from_bytes(source))
    }

    pub fn context(&mut self) -> &mut Context {
        self.context
    }

    /// Stop capturing and return the accumulated output.
    pub fn finish(mut self) -> Result<String> {
        let captured = self.collect();
        self.restore();
        captured
    }

    fn collect(&mut self) -> Result<String> {
        let value = self
            .context
            .eval(Source::from_bytes(COLLECT_CAPTURE))
            .map_err(|e| CodepadError::Evaluation(format!("failed to read captured output: {}", e)))?;
        let text = value
            .to_string(self.context)
            .map_err(|e| CodepadError::Evaluation(e.to_string()))?;
        Ok(text.to_std_string_escaped())
    }

    fn restore(&mut self) {
        if !self.installed {
            return;
        }
        self.installed = false;
        if let Err(e) = self.context.eval(Source::from_bytes(RESTORE_CONSOLE)) {
            warn!(error = %e, "Failed to restore console binding");
        }
    }
}

impl Drop for OutputCapture<'_> {
    fn drop(&mut self) {
        self.restore();
    }
}
