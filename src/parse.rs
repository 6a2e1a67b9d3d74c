//! Parsers for the registry's three page types: search listings, purchase
//! detail pages and outcome (supplier) pages.
//!
//! Missing optional markup degrades to empty or `None` fields rather than an
//! error. The registry serves several listing-type variants of the detail
//! card and partial records are acceptable. Only the search listing has hard
//! requirements, because the crawl cannot proceed without a result count.

use scraper::{ElementRef, Html};
use url::Url;

use crate::extract::{create_selector, extract_table, HeaderMapping};
use crate::normalize::{first_integer, normalize_text, parse_number};
use crate::record::{PurchasePosition, PurchaseRecord, Supplier};
use crate::{Error, Result};

/// Column headers of the purchase-object table, as the registry spells them.
const POSITION_COLUMNS: &HeaderMapping = &[
    ("Код позиции", "code"),
    ("Наименование Товара, Работы, Услуги по КТРУ", "name"),
    ("Лек. форма, дозировка и ед. измерения", "name"),
    ("Ед. измерения", "unit"),
    ("Количество", "quantity"),
    ("Цена за ед., ₽", "price_per_unit"),
    ("Начальная цена за единицу товара", "price_per_unit"),
    ("Стоимость, ₽", "total_price"),
];

/// Column headers of the outcome page's participant table. The registry
/// switches between singular and plural spellings.
const SUPPLIER_COLUMNS: &HeaderMapping = &[
    ("Участник(и), с которыми планируется заключить контракт", "name"),
    ("Наименование участника", "name"),
    ("Порядковые номера, полученные по результатам рассмотрения заявок", "number"),
    ("Порядковый номер, полученный по результатам рассмотрения заявки", "number"),
    ("Предложения участников, ₽", "offer"),
    ("Предложение участника, ₽", "offer"),
];

/// Section label of the outcome tab on a detail page.
const SUPPLIER_TAB_LABEL: &str = "Результаты определения поставщика";

/// One parsed search listing.
#[derive(Debug)]
pub struct SearchPage {
    /// Total result count the registry reports for the whole query, not
    /// just this page.
    pub total: u64,
    /// Absolute detail URLs of the rows on this page.
    pub detail_urls: Vec<String>,
}

/// Parses a search listing, joining every row's detail link against the
/// page URL. A listing without a readable result count is an error; the
/// planner cannot act without it.
pub fn parse_search_page(html: &str, page_url: &str) -> Result<SearchPage> {
    let doc = Html::parse_document(html);
    let total_sel = create_selector("div.search-results__total")?;
    let entry_sel = create_selector("div.registry-entry__form")?;
    let link_sel = create_selector("div.registry-entry__header-mid__number a")?;

    let total_text = doc
        .select(&total_sel)
        .next()
        .map(|el| el.text().collect::<String>())
        .ok_or_else(|| Error::MissingElement {
            url: page_url.to_owned(),
            what: "total result count",
        })?;
    let total = first_integer(&total_text).ok_or_else(|| Error::MissingElement {
        url: page_url.to_owned(),
        what: "numeric total result count",
    })?;

    let base = Url::parse(page_url)?;
    let mut detail_urls = Vec::new();
    for entry in doc.select(&entry_sel) {
        let Some(href) = entry.select(&link_sel).next().and_then(|a| a.value().attr("href"))
        else {
            tracing::warn!(url = %page_url, "result row without a detail link");
            continue;
        };
        match base.join(href) {
            Ok(joined) => detail_urls.push(joined.to_string()),
            Err(e) => tracing::warn!(href, error = %e, "unjoinable detail link"),
        }
    }
    Ok(SearchPage { total, detail_urls })
}

/// Parses a purchase detail page into a record draft, plus the href of the
/// outcome tab when the page has one.
pub fn parse_detail_page(html: &str, page_url: &str) -> Result<(PurchaseRecord, Option<String>)> {
    let doc = Html::parse_document(html);

    let id_sel = create_selector("span.cardMainInfo__purchaseLink a")?;
    let main_info_sel = create_selector("div.sectionMainInfo__body")?;
    let section_sel = create_selector("div.cardMainInfo__section")?;
    let title_sel = create_selector("span.cardMainInfo__title")?;
    let content_sel = create_selector("span.cardMainInfo__content")?;
    let date_sel = create_selector("div.date")?;
    let block_sel = create_selector("div.blockInfo")?;
    let block_title_sel = create_selector("h2.blockInfo__title")?;
    let block_section_sel = create_selector("section")?;
    let section_title_sel = create_selector("span.section__title")?;
    let section_info_sel = create_selector("span.section__info")?;
    let table_sel = create_selector("table.tableBlock")?;
    let tab_sel = create_selector("a.tabsNav__item")?;

    let mut record = PurchaseRecord {
        // The registry prefixes the number with a `№` marker glyph.
        id: text_of(doc.select(&id_sel).next()).replace('№', "").trim().to_owned(),
        url: page_url.to_owned(),
        ..Default::default()
    };

    // Listing-type variants can repeat these blocks; sections are scanned
    // across every occurrence, not just the first.
    for main_info in doc.select(&main_info_sel) {
        for section in main_info.select(&section_sel) {
            let title = text_of(section.select(&title_sel).next());
            if title.contains("Объект закупки") {
                record.object = text_of(section.select(&content_sel).next());
            }
        }
    }

    for dates in doc.select(&date_sel) {
        for section in dates.select(&section_sel) {
            let title = text_of(section.select(&title_sel).next());
            let content = section.select(&content_sel).next();
            if title.contains("Размещено") {
                record.placement_date = Some(text_of(content));
            } else if title.contains("Окончание подачи заявок") {
                record.application_deadline = Some(text_of(content));
            }
        }
    }

    for block in doc.select(&block_sel) {
        let block_title = text_of(block.select(&block_title_sel).next());
        if block_title.contains("Контактная информация") {
            for section in block.select(&block_section_sel) {
                let title = text_of(section.select(&section_title_sel).next());
                let info = section.select(&section_info_sel).next();
                if title.contains("Организация") {
                    record.customer = Some(text_of(info));
                } else if title.contains("Регион") {
                    record.region = Some(text_of(info));
                }
            }
        } else if block_title.contains("цена контракта") {
            for section in block.select(&block_section_sel) {
                let title = text_of(section.select(&section_title_sel).next());
                let info = section.select(&section_info_sel).next();
                if title.contains("цена контракта") {
                    record.start_price = parse_number(&text_of(info));
                } else if title.contains("Валюта") {
                    record.currency = Some(text_of(info));
                }
            }
        } else if block_title.contains("Информация об объекте закупки") {
            let table = block.select(&table_sel).next();
            record.purchase_positions = extract_table(table, POSITION_COLUMNS, page_url)?
                .into_iter()
                .map(|row| PurchasePosition {
                    code: row.get("code").cloned().unwrap_or_default(),
                    name: row.get("name").cloned().unwrap_or_default(),
                    unit: row.get("unit").cloned().unwrap_or_default(),
                    quantity: row.get("quantity").and_then(|v| parse_number(v)),
                    price_per_unit: row.get("price_per_unit").and_then(|v| parse_number(v)),
                    total_price: row.get("total_price").and_then(|v| parse_number(v)),
                })
                .collect();
        }
    }

    let supplier_href = doc
        .select(&tab_sel)
        .find(|tab| text_of(Some(*tab)).contains(SUPPLIER_TAB_LABEL))
        .and_then(|tab| tab.value().attr("href").map(str::to_owned));

    Ok((record, supplier_href))
}

/// Parses the outcome page's participant table. `Ok(None)` when the page has
/// no participant section at all, which is distinct from an empty table.
pub fn parse_supplier_page(html: &str, page_url: &str) -> Result<Option<Vec<Supplier>>> {
    let doc = Html::parse_document(html);
    let container_sel = create_selector(r#"div[id^="supplier-def-result-participant-table"]"#)?;
    let table_sel = create_selector("table")?;

    let Some(container) = doc.select(&container_sel).next() else {
        return Ok(None);
    };
    let table = container.select(&table_sel).next();
    let suppliers = extract_table(table, SUPPLIER_COLUMNS, page_url)?
        .into_iter()
        .map(|row| Supplier {
            name: row.get("name").cloned().unwrap_or_default(),
            number: row.get("number").cloned().unwrap_or_default(),
            offer: row.get("offer").and_then(|v| parse_number(v)),
        })
        .collect();
    Ok(Some(suppliers))
}

/// All descendant text of an element, normalized. Empty when absent.
fn text_of(el: Option<ElementRef<'_>>) -> String {
    match el {
        Some(el) => normalize_text(&el.text().collect::<Vec<_>>().join(" ")),
        None => String::new(),
    }
}
