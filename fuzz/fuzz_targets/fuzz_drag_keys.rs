#![no_main]

use libfuzzer_sys::fuzz_target;
use mapforge_tree::DragItem;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(item) = DragItem::parse(raw) {
        // Parsed keys render back to something that parses to the same item.
        let reparsed = DragItem::parse(&item.to_string()).expect("display output must parse");
        assert_eq!(reparsed, item);
        assert_eq!(item.id.catalog_key().map(|key| key.kind), Some(item.kind));
    }
});
