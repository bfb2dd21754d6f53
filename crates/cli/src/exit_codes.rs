//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                           |
//! |------|---------------------------------------------------|
//! | 0    | Success                                           |
//! | 1    | General error (unspecified)                       |
//! | 2    | Usage error (bad args, unreadable settings file)  |
//! | 3    | Dataset or record not found                       |
//! | 4    | Uploaded sheet could not be decoded               |
//! | 5    | Storage failure                                   |
//! | 6    | Revision conflict (concurrent write)              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `CliError` in main.rs

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, empty edit, invalid settings file.
pub const EXIT_USAGE: u8 = 2;

/// `show`, `delete` or `update` named something that does not exist.
pub const EXIT_NOT_FOUND: u8 = 3;

/// The uploaded file is unreadable or not a spreadsheet. Nothing was written.
pub const EXIT_DECODE: u8 = 4;

/// The database could not be opened, read or written.
pub const EXIT_STORAGE: u8 = 5;

/// Another upload or edit of the same dataset landed first. Nothing was
/// written; re-running the command is safe.
pub const EXIT_CONFLICT: u8 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_NOT_FOUND,
            EXIT_DECODE,
            EXIT_STORAGE,
            EXIT_CONFLICT,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
