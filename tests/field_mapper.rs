use lead_ingest::{ColumnLayout, LeadField};

#[test]
fn headers_resolve_by_substring_case_insensitively() {
    let cases = [
        ("Client Name", Some(LeadField::ClientName)),
        ("FULL_NAME", Some(LeadField::ClientName)),
        ("Mobile Phone", Some(LeadField::ClientPhone)),
        ("client_phone2", Some(LeadField::ClientPhone2)),
        ("Phone 2", Some(LeadField::ClientPhone2)),
        ("Client Phone 3", Some(LeadField::ClientPhone3)),
        ("E-mail", None),
        ("Email Address", Some(LeadField::ClientEmail)),
        ("Job", Some(LeadField::ClientJobTitle)),
        ("Title", Some(LeadField::ClientJobTitle)),
        ("Lead Source", Some(LeadField::Platform)),
        ("platform", Some(LeadField::Platform)),
        ("Status", Some(LeadField::Stage)),
        ("Budget", None),
    ];
    for (header, expected) in cases {
        assert_eq!(LeadField::from_header(header), expected, "header {header:?}");
    }
}

#[test]
fn first_rule_wins() {
    // "name" is checked before "title" and "source"
    assert_eq!(LeadField::from_header("Job Title Name"), Some(LeadField::ClientName));
    assert_eq!(LeadField::from_header("Source Name"), Some(LeadField::ClientName));
    // a phone header mentioning 2 or 3 never becomes the primary phone
    assert_eq!(LeadField::from_header("phone_2nd"), None);
}

#[test]
fn missing_cells_read_as_empty_and_extra_cells_are_dropped() {
    let layout = ColumnLayout::from_headers(&["name", "phone", "email"]);
    let short = layout.map_row(&["Ahmed"]);
    assert_eq!(short.client_name, "Ahmed");
    assert_eq!(short.client_phone, "");
    assert_eq!(short.client_email, "");

    let long = layout.map_row(&["Ahmed", "+2010", "a@x.com", "surplus"]);
    assert_eq!(long.client_email, "a@x.com");
}

#[test]
fn later_duplicate_column_wins() {
    let layout = ColumnLayout::from_headers(&["First Name", "Phone", "Last Name"]);
    let lead = layout.map_row(&["Ahmed", "+2010", "Hassan"]);
    assert_eq!(lead.client_name, "Hassan");
}

#[test]
fn unmapped_headers_are_ignored() {
    let layout = ColumnLayout::from_headers(&["Notes", "Name", "Budget", "Phone"]);
    assert_eq!(
        layout.columns(),
        &[None, Some(LeadField::ClientName), None, Some(LeadField::ClientPhone)]
    );
    assert!(layout.resolves(LeadField::ClientPhone));
    assert!(!layout.resolves(LeadField::Stage));
}

#[test]
fn positional_layout_follows_canonical_order() {
    let layout = ColumnLayout::positional();
    let lead = layout.map_row(&[
        "Aya", "+2016", "+2017", "", "aya@x.com", "Architect", "Google", "Potential",
    ]);
    assert_eq!(lead.client_name, "Aya");
    assert_eq!(lead.client_phone2, "+2017");
    assert_eq!(lead.client_job_title, "Architect");
    assert_eq!(lead.platform, "Google");
    assert_eq!(lead.stage, "Potential");
}
