pub mod decoders;
pub mod extract;
pub mod fingerprint;
pub mod labels;

use std::path::Path;

/// Extensions picked up by directory scans and watch events.
pub const EMAIL_EXTENSIONS: [&str; 3] = ["eml", "mbox", "elmx"];

/// Case-insensitive extension check; the file is not touched.
pub fn is_email_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            EMAIL_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
