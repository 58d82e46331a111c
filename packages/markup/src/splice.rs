//! Splicing a re-serialized declaration blob back into markup text.
//!
//! Saving does not pretty-print the markup (that is a collaborator's job); it
//! only replaces the body of the declaration script element, leaving every
//! other byte of the source untouched.

use crate::{MarkupError, DECLARATION_SCRIPT_TYPE};

/// Replace the contents of the declaration script element in `source` with
/// `declaration`.
pub fn splice_declaration(source: &str, declaration: &str) -> Result<String, MarkupError> {
    // Both attribute quote styles are valid markup.
    let double_quoted = format!("type=\"{}\"", DECLARATION_SCRIPT_TYPE);
    let single_quoted = format!("type='{}'", DECLARATION_SCRIPT_TYPE);

    let mut search_from = 0;
    while let Some(open) = source[search_from..].find("<script") {
        let open = search_from + open;
        let tag_end = source[open..]
            .find('>')
            .map(|i| open + i + 1)
            .ok_or(MarkupError::MissingDeclarationScript)?;

        let opening_tag = &source[open..tag_end];
        if opening_tag.contains(&double_quoted) || opening_tag.contains(&single_quoted) {
            let close = source[tag_end..]
                .find("</script>")
                .map(|i| tag_end + i)
                .ok_or(MarkupError::MissingDeclarationScript)?;

            let mut out = String::with_capacity(source.len() + declaration.len());
            out.push_str(&source[..tag_end]);
            // Binding arrows contain `<`; keep the document well formed.
            if declaration.contains('<') || declaration.contains('&') {
                out.push_str("<![CDATA[");
                out.push_str(declaration);
                out.push_str("]]>");
            } else {
                out.push_str(declaration);
            }
            out.push_str(&source[close..]);
            return Ok(out);
        }

        search_from = tag_end;
    }

    Err(MarkupError::MissingDeclarationScript)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_declaration_body_only() {
        let source = concat!(
            "<html><head>\n",
            "<script type=\"text/javascript\">var x;</script>\n",
            "<script type=\"text/declaration\">{\"owner\": {}}</script>\n",
            "</head><body/></html>",
        );

        let out = splice_declaration(source, "{\"owner\": {\"properties\": {}}}").unwrap();
        assert!(out.contains("<script type=\"text/declaration\">{\"owner\": {\"properties\": {}}}</script>"));
        assert!(out.contains("var x;"));
    }

    #[test]
    fn binding_arrows_get_cdata_wrapped() {
        let source = "<html><head><script type=\"text/declaration\">{}</script></head><body/></html>";
        let out = splice_declaration(source, "{\"b\": {\"<-\": \"@owner.x\"}}").unwrap();
        assert!(out.contains("<![CDATA[{\"b\": {\"<-\": \"@owner.x\"}}]]>"));
        assert!(crate::MarkupTree::parse(&out).is_ok());
    }

    #[test]
    fn single_quoted_type_attribute_is_found() {
        let source =
            "<html><head><script type='text/declaration'>{}</script></head><body/></html>";
        let out = splice_declaration(source, "{\"owner\": {}}").unwrap();
        assert!(out.contains("<script type='text/declaration'>{\"owner\": {}}</script>"));
    }

    #[test]
    fn missing_script_is_an_error() {
        let err = splice_declaration("<html><body/></html>", "{}").unwrap_err();
        assert!(matches!(err, MarkupError::MissingDeclarationScript));
    }
}
