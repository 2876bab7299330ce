/// A small PNG-flavored payload: the real file signature followed by
/// deterministic filler bytes. Tests treat image payloads as opaque, so all
/// they need from a fixture are the magic bytes and stable content.
pub fn png_fixture() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend((0u32..64).map(|idx| {
        return (idx * 7 % 251) as u8;
    }));

    return bytes;
}
