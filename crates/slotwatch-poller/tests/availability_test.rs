mod common;

use common::FakePage;
use slotwatch_browser::Locator;
use slotwatch_core::{FormConfig, PacingConfig, SiteConfig};
use slotwatch_poller::{check_availability, fill_booking_form, Availability, PollError};

fn no_pacing() -> PacingConfig {
    PacingConfig {
        form_step_ms: 0,
        form_done_ms: 0,
        availability_ms: 0,
        ..PacingConfig::default()
    }
}

#[tokio::test]
async fn test_no_slots_phrase_wins_over_date_picker() {
    let site = SiteConfig::default();
    let page = FakePage::new()
        .text("Rezerwacja wizyty. Brak wolnych terminów w wybranej placówce.")
        .show(&site.dropdown(3))
        .options(&["12.05"]);

    let result = check_availability(&page, &site, &no_pacing()).await.unwrap();

    match result {
        Availability::NoSlots { reason } => assert!(reason.contains("brak wolnych termin")),
        other => panic!("expected NoSlots, got {other:?}"),
    }
}

#[tokio::test]
async fn test_disabled_form_without_date_picker() {
    let site = SiteConfig::default();
    let page = FakePage::new()
        .text("Rodzaj usługi Lokalizacja")
        .attr(&site.dropdown(0), "aria-disabled", "true")
        .show(&site.submit_button);

    let result = check_availability(&page, &site, &no_pacing()).await.unwrap();

    assert_eq!(
        result,
        Availability::NoSlots {
            reason: "No appointments available, form fields disabled and no date picker shown"
                .to_string()
        }
    );
}

#[tokio::test]
async fn test_date_picker_lists_offered_dates() {
    let site = SiteConfig::default();
    let page = FakePage::new()
        .text("Termin")
        .show(&site.dropdown(3))
        .options(&["12.05", " 13.05 ", "14.05"]);

    let result = check_availability(&page, &site, &no_pacing()).await.unwrap();

    assert_eq!(
        result,
        Availability::Found {
            dates: vec!["12.05".to_string(), "13.05".to_string(), "14.05".to_string()],
            message: "APPOINTMENTS FOUND! Available dates: 12.05, 13.05, 14.05".to_string(),
        }
    );
    let actions = page.actions();
    assert_eq!(actions, vec![format!("click {}", site.dropdown(3)), "escape".to_string()]);
}

#[tokio::test]
async fn test_continue_button_without_readable_dates() {
    let site = SiteConfig::default();
    let page = FakePage::new()
        .text("Wybierz termin")
        .show(&site.submit_button)
        .unclickable(&site.dropdown(3));

    let result = check_availability(&page, &site, &no_pacing()).await.unwrap();

    assert_eq!(
        result,
        Availability::Found {
            dates: Vec::new(),
            message: "APPOINTMENTS FOUND! Available dates: (could not read options)".to_string(),
        }
    );
}

#[tokio::test]
async fn test_indeterminate_page_is_no_slots_with_snippet() {
    let site = SiteConfig::default();
    let text = format!("  Serwis chwilowo niedostępny. {}", "x".repeat(500));
    let page = FakePage::new().text(&text);

    let result = check_availability(&page, &site, &no_pacing()).await.unwrap();

    let Availability::NoSlots { reason } = result else {
        panic!("expected NoSlots");
    };
    assert!(reason.starts_with(
        "Unable to determine availability. Page text snippet: \"Serwis chwilowo niedostępny."
    ));
    assert!(reason.len() < 400);
}

#[tokio::test]
async fn test_form_selections_in_order() {
    let site = SiteConfig::default();
    let form = FormConfig::default();
    let page = FakePage::new();

    fill_booking_form(&page, &site, &form, &no_pacing())
        .await
        .unwrap();

    let expected: Vec<String> = vec![
        site.dropdown(0),
        Locator::exact_text(site.option_css.clone(), "Wiza krajowa"),
        site.dropdown(1),
        Locator::with_text(site.option_css.clone(), "Abu Zabi"),
        site.dropdown(2),
        Locator::with_text(site.option_css.clone(), "1 osob"),
    ]
    .into_iter()
    .map(|l| format!("click {l}"))
    .collect();
    assert_eq!(page.actions(), expected);
}

#[tokio::test]
async fn test_missing_option_names_the_field() {
    let site = SiteConfig::default();
    let form = FormConfig::default();
    let page = FakePage::new().unclickable(&Locator::with_text(site.option_css.clone(), "Abu Zabi"));

    let err = fill_booking_form(&page, &site, &form, &no_pacing())
        .await
        .unwrap_err();

    assert!(matches!(err, PollError::Form { field: "location", .. }));
}
