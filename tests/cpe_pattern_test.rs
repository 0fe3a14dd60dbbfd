//! CPE to regex pattern translation

use component_index::cpe::{CpeError, CpeField, CpeName, CpePatternCompiler};
use component_index::search::SearchError;

#[test]
fn test_all_wildcards_match_any_application() {
    let pattern = CpePatternCompiler::compile("cpe:2.3:a:*:*:*:*:*:*:*:*:*:*").unwrap();

    assert_eq!(pattern.field(), CpeField::Cpe23);
    assert!(pattern.matches("cpe:2.3:a:gnu:mc:4.8.27:*:*:*:*:*:*:*").unwrap());
    assert!(pattern.matches("cpe:2.3:a:apache:commons-text:1.9:*:*:*:*:*:*:*").unwrap());
    assert!(!pattern.matches("cpe:2.3:o:linux:linux_kernel:5.10:*:*:*:*:*:*:*").unwrap());
    assert!(!pattern.is_selective());
    assert!(matches!(
        pattern.require_selective(),
        Err(SearchError::InvalidQuery(_))
    ));
}

#[test]
fn test_fully_specified_matches_only_itself() {
    let cpe = "cpe:2.3:a:libexpat_project:libexpat:2.4.1:*:*:*:*:*:*:*";
    let pattern = CpePatternCompiler::compile(cpe).unwrap();

    assert!(pattern.is_selective());
    assert!(pattern.matches(cpe).unwrap());
    assert!(!pattern
        .matches("cpe:2.3:a:libexpat_project:libexpat:2x4x1:*:*:*:*:*:*:*")
        .unwrap());
    assert!(!pattern
        .matches("cpe:2.3:a:other_project:libexpat:2.4.1:*:*:*:*:*:*:*")
        .unwrap());
    assert!(!pattern
        .matches("cpe:2.3:a:libexpat_project:libexpat:2.4.10:*:*:*:*:*:*:*")
        .unwrap());
}

#[test]
fn test_short_formatted_string_pads_with_wildcards() {
    let pattern = CpePatternCompiler::compile("cpe:2.3:a:gnu:mc").unwrap();

    assert!(pattern.is_selective());
    assert!(pattern.matches("cpe:2.3:a:gnu:mc:4.8.27:*:*:*:*:*:*:*").unwrap());
    assert!(!pattern.matches("cpe:2.3:a:gnu:mcrypt:2.6:*:*:*:*:*:*:*").unwrap());
}

#[test]
fn test_embedded_wildcards() {
    let pattern = CpePatternCompiler::compile("cpe:2.3:a:libexpat_project:libexpat*").unwrap();
    assert!(pattern
        .matches("cpe:2.3:a:libexpat_project:libexpat_tools:1.0:*:*:*:*:*:*:*")
        .unwrap());

    let single = CpePatternCompiler::compile("cpe:2.3:a:gnu:m?").unwrap();
    assert!(single.matches("cpe:2.3:a:gnu:mc:4.8.27:*:*:*:*:*:*:*").unwrap());
    assert!(!single.matches("cpe:2.3:a:gnu:mcx:1.0:*:*:*:*:*:*:*").unwrap());
}

#[test]
fn test_uri_expression_and_matching() {
    let pattern = CpePatternCompiler::compile("cpe:/a:libexpat_project:libexpat").unwrap();

    assert_eq!(pattern.field(), CpeField::Cpe22);
    assert_eq!(
        pattern.expression(),
        r"cpe22:/cpe\:\/a\:libexpat_project\:libexpat(\:.*)?/"
    );
    assert!(pattern.matches("cpe:/a:libexpat_project:libexpat").unwrap());
    assert!(pattern.matches("cpe:/a:libexpat_project:libexpat:2.4.1").unwrap());
    assert!(!pattern.matches("cpe:/a:libexpat_project:libexpat_tools:1.0").unwrap());
}

#[test]
fn test_too_many_components() {
    let result = CpePatternCompiler::compile("cpe:2.3:a:b:c:d:e:f:g:h:i:j:k:l");
    assert!(matches!(
        result,
        Err(CpeError::TooManyComponents {
            count: 12,
            max: 11,
            ..
        })
    ));

    let uri = CpePatternCompiler::compile("cpe:/a:b:c:d:e:f:g:h");
    assert!(matches!(uri, Err(CpeError::TooManyComponents { max: 7, .. })));
}

#[test]
fn test_invalid_prefix() {
    assert!(matches!(
        CpePatternCompiler::compile("cpe:2.2:a:gnu:mc"),
        Err(CpeError::InvalidPrefix(_))
    ));
    assert!(matches!(
        CpeName::parse("pkg:maven/org.example/lib@1.0"),
        Err(CpeError::InvalidPrefix(_))
    ));
}

#[test]
fn test_bindings_convert() {
    let name = CpeName::parse("cpe:/a:apache:commons-text:1.9").unwrap();
    assert_eq!(
        name.to_cpe23_fs(),
        "cpe:2.3:a:apache:commons-text:1.9:*:*:*:*:*:*:*"
    );

    let back = CpeName::parse(&name.to_cpe23_fs()).unwrap();
    assert_eq!(back.to_cpe22_uri(), "cpe:/a:apache:commons-text:1.9");
}
