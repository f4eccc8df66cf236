//! Private utility module
use std::path::Path;

/// Whether the file at the given path is expected to be GZip encoded,
/// judging by its name.
pub fn is_gz_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .file_name()
        .map(|a| a.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false)
}

/// Interpret a fixed-size, NUL-padded byte field as text.
/// Everything from the first NUL onwards is ignored.
pub fn c_str_field(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Copy text into a fixed-size, NUL-padded byte field, truncating if needed.
pub fn to_c_str_field<const N: usize>(text: &str) -> [u8; N] {
    let mut field = [0; N];
    let bytes = text.as_bytes();
    let len = bytes.len().min(N);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

#[cfg(test)]
mod tests {
    use super::{c_str_field, is_gz_file, to_c_str_field};

    #[test]
    fn gz_file_names() {
        assert!(is_gz_file("/path/to/tracks.trk.gz"));
        assert!(is_gz_file("peaks.nii.gz"));
        assert!(is_gz_file("/path/to/.gz"));

        assert!(!is_gz_file(""));
        assert!(!is_gz_file("/path/to/tracks.trk"));
        assert!(!is_gz_file("/path/to/gz"));
    }

    #[test]
    fn c_strings() {
        assert_eq!(c_str_field(b"LAS\0"), "LAS");
        assert_eq!(c_str_field(b"RAS"), "RAS");
        assert_eq!(c_str_field(b"\0\0\0\0"), "");
        assert_eq!(c_str_field(b"FA\0junk"), "FA");

        let f: [u8; 4] = to_c_str_field("RAS");
        assert_eq!(&f, b"RAS\0");
        let f: [u8; 2] = to_c_str_field("RAS");
        assert_eq!(&f, b"RA");
    }
}
