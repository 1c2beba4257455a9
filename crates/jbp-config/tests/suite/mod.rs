mod diagnostics;
mod discovery;
mod memory;
