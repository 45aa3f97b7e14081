//! Medicine detail page extraction

use std::time::Duration;

use tracing::debug;

use super::human::{self, SKIM};
use crate::{Error, Result, session::BrowserSession, types::MedicineDetails};

/// Collects the known sections of a detail page into the `MedicineDetails`
/// shape. Headings ending in "of" or "to" match as prefixes since the page
/// appends the medicine name.
const EXTRACT_DETAILS_SCRIPT: &str = r#"
(() => {
    const text = el => (el && el.innerText ? el.innerText.trim() : '');
    const headings = sel => Array.from(document.querySelectorAll(sel || 'h2, h3, h4, div[class*="title"]'));
    const matches = (h, label) => {
        const t = text(h).toUpperCase();
        const l = label.toUpperCase();
        return /\s(OF|TO)$/.test(l) ? t.startsWith(l) : t === l;
    };
    const findHeading = label => headings().find(h => matches(h, label));

    const sectionText = label => {
        const h = findHeading(label);
        if (!h) return null;
        const next = h.nextElementSibling;
        if (text(next)) return text(next);
        const after = h.parentElement && h.parentElement.nextElementSibling;
        return text(after) || null;
    };

    const sectionList = label => {
        const h = findHeading(label);
        if (!h) return [];
        let items = h.nextElementSibling ? Array.from(h.nextElementSibling.querySelectorAll('li')) : [];
        const after = h.parentElement && h.parentElement.nextElementSibling;
        if (items.length === 0 && after) items = Array.from(after.querySelectorAll('li'));
        return items.map(text).filter(Boolean);
    };

    const safetyAdvice = () => {
        const out = {};
        const h = findHeading('Safety advice');
        if (!h || !h.parentElement) return out;
        const known = ['alcohol', 'pregnancy', 'breastfeeding', 'driving', 'kidney', 'liver'];
        h.parentElement.querySelectorAll('div[class*="warning-top"]').forEach(row => {
            const label = row.querySelector('span');
            if (!label) return;
            const key = text(label).toLowerCase().replace(/\s+/g, '');
            if (!known.includes(key)) return;
            const tag = row.querySelector('div[class*="warning-tag"]');
            out[key] = {
                status: tag ? text(tag).toUpperCase() : 'UNKNOWN',
                details: text(row.nextElementSibling)
            };
        });
        return out;
    };

    const missedDose = () => {
        const h = headings('h2, h3').find(h => text(h).includes('forget to take'));
        return h ? (text(h.nextElementSibling) || null) : null;
    };

    const substitutes = () => {
        const h = headings('h2, h3, div').find(h => text(h) === 'All substitutes');
        const pane = h && h.closest('div[class*="DrugPane__title"]');
        const list = pane && pane.nextElementSibling;
        if (!list) return [];
        const items = Array.from(list.querySelectorAll('div[class*="SubstituteItem__item"]'));
        if (items.length > 0) {
            return items.map(item => ({
                name: text(item.querySelector('div[class*="name"]')) || 'Unknown',
                price: text(item.querySelector('div[class*="price"]')) || 'Unknown',
                url: item.querySelector('a') ? item.querySelector('a').href : null
            }));
        }
        return Array.from(list.querySelectorAll('a[href*="/drugs/"]')).map(link => {
            const parent = link.closest('div');
            const price = parent ? (text(parent).match(/₹[\d.]+/) || [])[0] : null;
            return { name: text(link), price: price || 'Unknown', url: link.href };
        });
    };

    const patientConcerns = () => {
        const h = headings('h2, h3').find(h => text(h) === 'Patient concerns');
        const box = h && h.parentElement && h.parentElement.nextElementSibling;
        if (!box) return [];
        const slides = Array.from(box.querySelectorAll('.slick-slide:not(.slick-cloned)'));
        return slides.length > 0 ? slides.map(text) : [text(box)];
    };

    const faqs = () => Array.from(document.querySelectorAll('div[class*="Faqs__tile"]')).map(tile => ({
        question: text(tile.querySelector('h3[class*="Faqs__ques"]')) || 'Unknown',
        answer: text(tile.querySelector('div[class*="Faqs__ans"]')) || 'Unknown'
    }));

    const body = document.body ? document.body.innerText : '';
    const habit = body.includes('Habit Forming\nNo') ? false : (body.includes('Habit Forming\nYes') ? true : null);
    const howSection = sectionText('How');

    return {
        introduction: sectionText('Product introduction'),
        uses: sectionList('Uses of'),
        benefits: sectionText('Benefits of'),
        sideEffects: {
            summary: sectionText('Side effects of'),
            common: sectionList('Common side effects of')
        },
        howToUse: sectionText('How to use'),
        howItWorks: howSection && howSection.toLowerCase().includes('works') ? howSection : sectionText('How it works'),
        safetyAdvice: safetyAdvice(),
        missedDose: missedDose(),
        substitutes: substitutes(),
        quickTips: sectionList('Quick tips'),
        factBox: {
            habitForming: habit,
            therapeuticClass: sectionText('Therapeutic Class') || ((body.match(/Therapeutic Class\n(.*)/) || [])[1] || null)
        },
        patientConcerns: patientConcerns(),
        faqs: faqs(),
        manufacturerDetails: sectionText('Marketer details')
    };
})()
"#;

/// Load `url` in the session and extract its details.
///
/// A page without any known section yields [`Error::ExtractionEmpty`].
pub async fn fetch_details(
    session: &BrowserSession,
    url: &str,
    page_load_timeout: Duration,
) -> Result<MedicineDetails> {
    session.navigate(url, page_load_timeout).await?;
    human::perform(session.page(), SKIM).await;

    let details: MedicineDetails = session.evaluate_json(EXTRACT_DETAILS_SCRIPT).await?;
    if details.is_empty() {
        return Err(Error::extraction_empty(url));
    }

    debug!(
        "Extracted {} uses, {} substitutes, {} FAQs from {}",
        details.uses.len(),
        details.substitutes.len(),
        details.faqs.len(),
        url
    );
    Ok(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_payload_shape_decodes() {
        // Shape produced by the in-page script for a sparse page
        let payload = json!({
            "introduction": null,
            "uses": ["Bacterial infections"],
            "benefits": null,
            "sideEffects": {"summary": null, "common": []},
            "howToUse": null,
            "howItWorks": null,
            "safetyAdvice": {},
            "missedDose": null,
            "substitutes": [{"name": "Moxikind-CV 625", "price": "₹180", "url": null}],
            "quickTips": [],
            "factBox": {"habitForming": null, "therapeuticClass": "ANTI INFECTIVES"},
            "patientConcerns": [],
            "faqs": [{"question": "Is it safe?", "answer": "Yes"}],
            "manufacturerDetails": null
        });

        let details: MedicineDetails = serde_json::from_value(payload).unwrap();

        assert!(!details.is_empty());
        assert_eq!(details.substitutes[0].url, None);
        assert_eq!(details.fact_box.habit_forming, None);
        assert_eq!(
            details.fact_box.therapeutic_class.as_deref(),
            Some("ANTI INFECTIVES")
        );
    }
}
