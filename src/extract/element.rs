use scraper::ElementRef;

/// The two things extraction needs from a parsed element.
pub trait MarkupElement {
    fn attr(&self, name: &str) -> Option<&str>;
    fn text(&self) -> String;

    /// Attribute value, treating an empty string as missing.
    fn non_empty_attr(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|v| !v.is_empty())
    }
}

impl MarkupElement for ElementRef<'_> {
    fn attr(&self, name: &str) -> Option<&str> {
        self.value().attr(name)
    }

    fn text(&self) -> String {
        ElementRef::text(self).collect()
    }
}
