use std::io::{self, Write};

use dynrules_engine::Payload;

use crate::Script;

/// Receives a finished script as header, body and footer blocks.
pub trait ScriptSink {
    fn write_script(&mut self, header: &[u8], body: &[u8], footer: &[u8]) -> io::Result<()>;
}

/// A [`ScriptSink`] over any [`io::Write`]; flushes after each script.
#[derive(Debug)]
pub struct WriterSink<W> {
    writer: W,
}

impl<W> WriterSink<W>
where
    W: Write,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W> ScriptSink for WriterSink<W>
where
    W: Write,
{
    fn write_script(&mut self, header: &[u8], body: &[u8], footer: &[u8]) -> io::Result<()> {
        self.writer.write_all(header)?;
        self.writer.write_all(body)?;
        self.writer.write_all(footer)?;
        self.writer.flush()
    }
}

/// Text placed around every generated script body.
///
/// Both parts default to empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScriptFrame {
    pub header: Payload,
    pub footer: Payload,
}

impl ScriptFrame {
    pub fn new<H, F>(header: H, footer: F) -> Self
    where
        H: Into<Payload>,
        F: Into<Payload>,
    {
        Self {
            header: header.into(),
            footer: footer.into(),
        }
    }

    /// Writes the header, the script body and the footer to `sink`.
    pub fn emit<S>(&self, script: &Script, sink: &mut S) -> io::Result<()>
    where
        S: ScriptSink + ?Sized,
    {
        sink.write_script(
            self.header.as_bytes(),
            script.body().as_bytes(),
            self.footer.as_bytes(),
        )
    }
}

#[cfg(test)]
mod tests {
    use dynrules_engine::{Rule, RuleId, RuleSet};
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;
    use crate::ScriptGenerator;

    #[derive(Debug, Default)]
    struct RecordingSink {
        blocks: Vec<Vec<u8>>,
    }

    impl ScriptSink for RecordingSink {
        fn write_script(&mut self, header: &[u8], body: &[u8], footer: &[u8]) -> io::Result<()> {
            self.blocks = vec![header.to_vec(), body.to_vec(), footer.to_vec()];
            Ok(())
        }
    }

    fn single_rule_script() -> Script {
        let mut rule_set = RuleSet::new(0.0, 10.0).unwrap();
        rule_set.add(
            Rule::with_payload(RuleId(0), "hit();\n")
                .with_weight(1.0)
                .unwrap(),
        );
        ScriptGenerator::new(&rule_set)
            .generate(2, &mut Pcg64Mcg::seed_from_u64(1))
            .unwrap()
    }

    #[test]
    fn test_emit_passes_blocks_in_order() {
        let script = single_rule_script();
        let frame = ScriptFrame::new("-- header\n", "-- footer\n");
        let mut sink = RecordingSink::default();
        frame.emit(&script, &mut sink).unwrap();
        assert_eq!(
            sink.blocks,
            vec![
                b"-- header\n".to_vec(),
                b"hit();\nhit();\n".to_vec(),
                b"-- footer\n".to_vec(),
            ]
        );
    }

    #[test]
    fn test_writer_sink_concatenates() {
        let script = single_rule_script();
        let mut sink = WriterSink::new(Vec::new());
        ScriptFrame::default().emit(&script, &mut sink).unwrap();
        assert_eq!(sink.into_inner(), b"hit();\nhit();\n".to_vec());
    }
}
