use page_recorder::core::RecorderConfig;
use page_recorder::dom::parse_html;
use page_recorder::selector::{resolves_uniquely_to, SelectorGenerator};

const CATALOG: &str = r#"<body>
    <nav><a href="/">Home</a><a href="/cart" aria-label="Cart">Cart</a></nav>
    <main>
        <h1>Products</h1>
        <ul class="grid">
            <li class="card"><span>Lamp</span><button>Add</button></li>
            <li class="card"><span>Chair</span><button>Add</button></li>
            <li class="card"><span>Desk</span><button data-testid="add-desk">Add</button></li>
        </ul>
        <form>
            <label for="q">Search</label><input id="q" name="q">
            <input type="checkbox" name="in-stock">
            <button type="submit" aria-label="Run search">Go</button>
        </form>
        <div><span>dup</span><span>dup</span></div>
    </main>
</body>"#;

fn generator() -> SelectorGenerator {
    SelectorGenerator::new(RecorderConfig::default().selector)
}

#[test]
fn first_selector_resolves_to_exactly_its_element() {
    let doc = parse_html(CATALOG).unwrap();
    let generator = generator();
    let body = doc.body().unwrap();
    for node in doc.descendants(body) {
        if !doc.is_element(node) {
            continue;
        }
        let selectors = generator.generate(&doc, node, 0);
        assert!(!selectors.is_empty(), "no selector for {:?}", doc.tag_name(node));
        assert!(
            resolves_uniquely_to(&doc, &selectors[0], node),
            "{} is not unique",
            selectors[0]
        );
    }
}

#[test]
fn test_id_outranks_aria_label() {
    let doc =
        parse_html(r#"<body><button data-testid="save" aria-label="Save draft">Save</button></body>"#)
            .unwrap();
    let button = doc.descendants(doc.body().unwrap())[0];
    let selectors = generator().generate(&doc, button, 0);
    assert_eq!(selectors[0], r#"[data-testid="save"]"#);
}

#[test]
fn bare_elements_fall_back_to_a_unique_path() {
    let doc = parse_html(CATALOG).unwrap();
    let spans: Vec<_> = doc
        .descendants(doc.body().unwrap())
        .into_iter()
        .filter(|node| doc.tag_name(*node) == Some("span") && doc.text_content(*node) == "dup")
        .collect();
    assert_eq!(spans.len(), 2);
    let selectors = generator().generate(&doc, spans[1], 100);
    assert!(!selectors.is_empty());
    assert!(resolves_uniquely_to(&doc, &selectors[0], spans[1]));
    assert!(!resolves_uniquely_to(&doc, &selectors[0], spans[0]));
}

#[test]
fn nameless_button_is_located_by_role_alone() {
    let doc = parse_html(r#"<body><p>Empty toolbar</p><button></button></body>"#).unwrap();
    let button = doc
        .descendants(doc.body().unwrap())
        .into_iter()
        .find(|node| doc.tag_name(*node) == Some("button"))
        .unwrap();
    let selectors = generator().generate(&doc, button, 0);
    assert!(selectors.contains(&"role=button".to_string()));
    assert!(resolves_uniquely_to(&doc, "role=button", button));
}
