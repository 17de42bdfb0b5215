/// Transfer encoding for a single file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransferMode {
    Text,
    Binary,
}

impl TransferMode {
    pub fn label(self) -> &'static str {
        match self {
            TransferMode::Text => "text",
            TransferMode::Binary => "binary",
        }
    }
}

// source / markup extensions sent as text
const TEXT_EXTENSIONS: &[&str] = &[
    "am", "asp", "bat", "c", "cfm", "cgi", "conf", "cpp", "css", "dhtml", "diz", "h", "hpp", "htm",
    "html", "in", "inc", "js", "m4", "mak", "nfs", "nsi", "pas", "patch", "php", "php3", "php4",
    "php5", "phtml", "pl", "po", "py", "qmail", "sh", "shtml", "sql", "tcl", "tpl", "txt", "vbs",
    "xml", "xrc",
];

/// Pick the transfer mode from the file name alone (no content sniffing).
pub fn mode_for(file_name: &str) -> TransferMode {
    if file_name == ".htaccess" {
        return TransferMode::Text;
    }
    let ext = match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => return TransferMode::Binary,
    };
    if TEXT_EXTENSIONS.contains(&ext.as_str()) { TransferMode::Text } else { TransferMode::Binary }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names() {
        assert_eq!(mode_for("index.html"), TransferMode::Text);
        assert_eq!(mode_for("photo.png"), TransferMode::Binary);
        assert_eq!(mode_for(".htaccess"), TransferMode::Text);
        assert_eq!(mode_for("README"), TransferMode::Binary);
    }

    #[test]
    fn extension_is_case_insensitive_and_last() {
        assert_eq!(mode_for("SETUP.PY"), TransferMode::Text);
        assert_eq!(mode_for("archive.txt.gz"), TransferMode::Binary);
        assert_eq!(mode_for("dump.sql"), TransferMode::Text);
    }

    #[test]
    fn trailing_dot_has_no_extension() {
        assert_eq!(mode_for("weird."), TransferMode::Binary);
    }
}
