//! nmap: XML (`-oX`)

use pentaflow_core::types::Severity;

use super::{BackendParser, ParseOutcome};
use crate::error::NormalizerError;

/// nmap 포트 스캐너 출력 파서
///
/// `state="open"`인 모든 `<port>`를 Low finding 으로 보고합니다.
#[derive(Debug, Default)]
pub struct NmapParser;

impl BackendParser for NmapParser {
    fn prefix(&self) -> &str {
        "nmap"
    }

    fn parse(&self, input: &str) -> Result<ParseOutcome, NormalizerError> {
        // `-oX` 출력은 항상 `<!DOCTYPE nmaprun>`을 포함합니다.
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let document = roxmltree::Document::parse_with_options(input.trim(), options)
            .map_err(|e| NormalizerError::parse(self.prefix(), e))?;

        let mut outcome = ParseOutcome::default();
        for port in document.descendants().filter(|n| n.has_tag_name("port")) {
            let Some(portid) = port.attribute("portid") else {
                outcome.skip();
                continue;
            };
            let state = port
                .children()
                .find(|n| n.has_tag_name("state"))
                .and_then(|n| n.attribute("state"));
            if state != Some("open") {
                continue;
            }

            let protocol = port.attribute("protocol").unwrap_or("tcp");
            let service = port.children().find(|n| n.has_tag_name("service"));
            let name = service
                .and_then(|s| s.attribute("name"))
                .unwrap_or("unknown");
            let product = service
                .map(|s| {
                    [s.attribute("product"), s.attribute("version")]
                        .into_iter()
                        .flatten()
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();

            let mut description = format!("Port {portid}/{protocol} is open.");
            if !product.is_empty() {
                description.push_str(&format!(" Service: {product}."));
            }
            outcome.push(
                format!("Open Port: {portid}/{protocol} ({name})"),
                Severity::Low,
                description,
            );
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<nmaprun scanner="nmap">
  <host>
    <ports>
      <port protocol="tcp" portid="22"><state state="open"/><service name="ssh" product="OpenSSH" version="8.9p1"/></port>
      <port protocol="tcp" portid="80"><state state="open"/><service name="http"/></port>
      <port protocol="tcp" portid="443"><state state="closed"/><service name="https"/></port>
      <port protocol="udp" portid="53"><state state="open"/></port>
    </ports>
  </host>
</nmaprun>"#;

    #[test]
    fn reports_open_ports_only() {
        let outcome = NmapParser.parse(SAMPLE).unwrap();
        let titles: Vec<_> = outcome.drafts.iter().map(|d| d.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Open Port: 22/tcp (ssh)",
                "Open Port: 80/tcp (http)",
                "Open Port: 53/udp (unknown)"
            ]
        );
        assert!(outcome.drafts.iter().all(|d| d.severity == Severity::Low));
        assert_eq!(
            outcome.drafts[0].description,
            "Port 22/tcp is open. Service: OpenSSH 8.9p1."
        );
    }

    #[test]
    fn doctype_header_is_accepted() {
        let input = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE nmaprun>
<?xml-stylesheet href="file:///usr/bin/../share/nmap/nmap.xsl" type="text/xsl"?>
<nmaprun scanner="nmap" args="nmap -oX - 192.0.2.10" version="7.94">
  <host>
    <ports>
      <port protocol="tcp" portid="22"><state state="open" reason="syn-ack"/><service name="ssh"/></port>
    </ports>
  </host>
</nmaprun>"#;
        let outcome = NmapParser.parse(input).unwrap();
        assert_eq!(outcome.drafts.len(), 1);
        assert_eq!(outcome.drafts[0].title, "Open Port: 22/tcp (ssh)");
    }

    #[test]
    fn no_open_ports_is_empty() {
        let input = r#"<nmaprun><host><ports><port portid="1"><state state="filtered"/></port></ports></host></nmaprun>"#;
        assert!(NmapParser.parse(input).unwrap().drafts.is_empty());
    }

    #[test]
    fn truncated_xml_is_document_error() {
        assert!(NmapParser.parse("<nmaprun><host>").is_err());
    }
}
