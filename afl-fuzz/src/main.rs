use std::io::Cursor;

use nom_imgmeta::MetadataParser;

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let parser = MetadataParser::new().with_unknown_tags(true);
    afl::fuzz!(|data: &[u8]| {
        let _ = nom_imgmeta::read_metadata(Cursor::new(data));
        let _ = parser.detect(Cursor::new(data));

        // Same input, starting in the middle of a larger stream.
        let mut padded = vec![0u8; 3];
        padded.extend_from_slice(data);
        let mut reader = Cursor::new(padded);
        reader.set_position(3);
        let _ = parser.read(&mut reader);
    });
}
