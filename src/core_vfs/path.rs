/// Lexically cleans a client-supplied virtual path.
///
/// Empty and `.` segments are dropped, `..` pops the previous segment and is
/// clamped at the root, duplicate separators collapse. The result is always
/// absolute and contains no dot segments, so escape attempts resolve to a
/// path at or below `/`.
pub fn clean_virtual_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            segment => stack.push(segment),
        }
    }

    if stack.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", stack.join("/"))
    }
}

/// Joins a command argument onto the session's working directory: absolute
/// arguments are taken as-is, relative ones are appended, and the result is
/// cleaned.
pub fn join_virtual(cwd: &str, arg: &str) -> String {
    if arg.starts_with('/') {
        clean_virtual_path(arg)
    } else if cwd == "/" {
        clean_virtual_path(&format!("/{}", arg))
    } else {
        clean_virtual_path(&format!("{}/{}", cwd, arg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_dot_segments() {
        assert_eq!(clean_virtual_path("/a/./b"), "/a/b");
        assert_eq!(clean_virtual_path("/a/b/.."), "/a");
        assert_eq!(clean_virtual_path("/a/../b"), "/b");
        assert_eq!(clean_virtual_path("."), "/");
        assert_eq!(clean_virtual_path("/"), "/");
    }

    #[test]
    fn collapses_duplicate_separators() {
        assert_eq!(clean_virtual_path("//a///b//"), "/a/b");
    }

    #[test]
    fn relative_paths_become_absolute() {
        assert_eq!(clean_virtual_path("a/b"), "/a/b");
        assert_eq!(clean_virtual_path("file.txt"), "/file.txt");
    }

    #[test]
    fn escape_attempts_clamp_at_root() {
        assert_eq!(clean_virtual_path(".."), "/");
        assert_eq!(clean_virtual_path("../.."), "/");
        assert_eq!(clean_virtual_path("../../etc/passwd"), "/etc/passwd");
        assert_eq!(clean_virtual_path("/../../etc"), "/etc");
        assert_eq!(clean_virtual_path("/a/../../../b"), "/b");
        assert_eq!(clean_virtual_path("a/../../b/../../c"), "/c");
    }

    #[test]
    fn output_never_contains_dot_segments() {
        let hostile = [
            "..", "../", "/..", "a/..", "./../.", "..//..", "/a//../..//b/./..",
            "....//..", "..%2f..", "/a/b/c/../../../../..",
        ];
        for input in hostile {
            let cleaned = clean_virtual_path(input);
            assert!(cleaned.starts_with('/'), "{:?} -> {:?}", input, cleaned);
            for segment in cleaned.split('/') {
                assert_ne!(segment, "..", "{:?} -> {:?}", input, cleaned);
                assert_ne!(segment, ".", "{:?} -> {:?}", input, cleaned);
            }
        }
    }

    #[test]
    fn joins_relative_to_cwd() {
        assert_eq!(join_virtual("/", "file"), "/file");
        assert_eq!(join_virtual("/public", "file"), "/public/file");
        assert_eq!(join_virtual("/public", "/abs"), "/abs");
        assert_eq!(join_virtual("/public", "../etc"), "/etc");
        assert_eq!(join_virtual("/public/sub", ".."), "/public");
    }
}
