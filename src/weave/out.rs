//! Indenting text sink used by the weaving pass.

const INDENT: &str = "  ";

#[derive(Debug, Default)]
pub struct OutStream {
    buf: String,
    level: usize,
}

impl OutStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one indented line.
    pub fn line(&mut self, text: &str) -> &mut Self {
        if !text.is_empty() {
            for _ in 0..self.level {
                self.buf.push_str(INDENT);
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
        self
    }

    /// Writes text as is, without indentation. Used for user code.
    pub fn raw(&mut self, text: &str) -> &mut Self {
        self.buf.push_str(text);
        self
    }

    /// Writes `/*@bgen(jjtree) <what> */`, the start of a generated region.
    pub fn bgen(&mut self, what: &str) -> &mut Self {
        if what.is_empty() {
            self.line("/*@bgen(jjtree)*/")
        } else {
            self.line(&format!("/*@bgen(jjtree) {} */", what))
        }
    }

    /// Writes `/*@egen*/`, the end of a generated region.
    pub fn egen(&mut self) -> &mut Self {
        self.line("/*@egen*/")
    }

    pub fn push_indent(&mut self) {
        self.level += 1;
    }

    pub fn pop_indent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    pub fn indented(&mut self, f: impl FnOnce(&mut Self)) -> &mut Self {
        self.push_indent();
        f(self);
        self.pop_indent();
        self
    }

    /// Writes `head {`, the indented body, then `}`.
    pub fn block(&mut self, head: &str, f: impl FnOnce(&mut Self)) -> &mut Self {
        if head.is_empty() {
            self.line("{");
        } else {
            self.line(&format!("{} {{", head));
        }
        self.indented(f);
        self.line("}")
    }

    /// Finishes the output, trimming trailing whitespace from every line.
    pub fn finish(self) -> String {
        let mut out = String::with_capacity(self.buf.len());
        for line in self.buf.lines() {
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}
