use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use trdp_xml_validate::document::TextDocument;
use trdp_xml_validate::overlay::{ColorScheme, FixedTheme, ThemePolicy};
use trdp_xml_validate::pane::EditorPane;

/// Cut-down TRDP device configuration schema
pub const TRDP_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="device">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="bus-interface-list" minOccurs="0">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="bus-interface" maxOccurs="unbounded">
                <xs:complexType>
                  <xs:sequence>
                    <xs:element name="telegram" minOccurs="0" maxOccurs="unbounded">
                      <xs:complexType>
                        <xs:attribute name="name" type="xs:string"/>
                        <xs:attribute name="com-id" type="xs:unsignedInt" use="required"/>
                        <xs:attribute name="data-set-id" type="xs:unsignedInt"/>
                        <xs:attribute name="com-parameter-id" type="xs:unsignedInt"/>
                      </xs:complexType>
                    </xs:element>
                  </xs:sequence>
                  <xs:attribute name="network-id" type="xs:unsignedByte" use="required"/>
                  <xs:attribute name="name" type="xs:string"/>
                </xs:complexType>
              </xs:element>
            </xs:sequence>
          </xs:complexType>
        </xs:element>
        <xs:element name="com-parameter-list" minOccurs="0">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="com-parameter" maxOccurs="unbounded">
                <xs:complexType>
                  <xs:attribute name="id" type="xs:unsignedInt" use="required"/>
                </xs:complexType>
              </xs:element>
            </xs:sequence>
          </xs:complexType>
        </xs:element>
        <xs:element name="data-set-list" minOccurs="0">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="data-set" maxOccurs="unbounded">
                <xs:complexType>
                  <xs:attribute name="id" type="xs:unsignedInt" use="required"/>
                  <xs:attribute name="name" type="xs:string"/>
                </xs:complexType>
              </xs:element>
            </xs:sequence>
          </xs:complexType>
        </xs:element>
      </xs:sequence>
      <xs:attribute name="host-name" type="xs:string"/>
    </xs:complexType>
  </xs:element>
</xs:schema>
"#;

/// Schema- and integrity-valid device
pub const VALID_DEVICE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<device host-name="ccu">
  <bus-interface-list>
    <bus-interface network-id="1" name="eth0">
      <telegram name="door" com-id="1001" data-set-id="1" com-parameter-id="1"/>
      <telegram name="light" com-id="1002" data-set-id="2" com-parameter-id="1"/>
    </bus-interface>
  </bus-interface-list>
  <com-parameter-list>
    <com-parameter id="1"/>
  </com-parameter-list>
  <data-set-list>
    <data-set id="1" name="door-state"/>
    <data-set id="2" name="light-state"/>
  </data-set-list>
</device>
"#;

/// `com-id` on line 5 is not a number
pub const SCHEMA_INVALID_DEVICE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<device host-name="ccu">
  <bus-interface-list>
    <bus-interface network-id="1" name="eth0">
      <telegram name="door" com-id="door" data-set-id="1" com-parameter-id="1"/>
    </bus-interface>
  </bus-interface-list>
</device>
"#;

/// Two telegrams share `com-id` 1001, and one points at a missing data set
pub const DUPLICATE_COM_ID_DEVICE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<device host-name="ccu">
  <bus-interface-list>
    <bus-interface network-id="1">
      <telegram com-id="1001" data-set-id="1"/>
      <telegram com-id="1001" data-set-id="9"/>
    </bus-interface>
  </bus-interface-list>
  <data-set-list>
    <data-set id="1"/>
  </data-set-list>
</device>
"#;

/// Telegram 1002 references a data set and a parameter set that do not exist
pub const DANGLING_REFERENCE_DEVICE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<device host-name="ccu">
  <bus-interface-list>
    <bus-interface network-id="1">
      <telegram com-id="1001" data-set-id="1" com-parameter-id="1"/>
      <telegram com-id="1002" data-set-id="7" com-parameter-id="3"/>
    </bus-interface>
  </bus-interface-list>
  <com-parameter-list>
    <com-parameter id="1"/>
  </com-parameter-list>
  <data-set-list>
    <data-set id="1"/>
  </data-set-list>
</device>
"#;

/// Valid, but all on one line
pub const COMPACT_DEVICE: &str = r#"<device host-name="ccu"><bus-interface-list><bus-interface network-id="1"><telegram com-id="1001"/></bus-interface></bus-interface-list></device>"#;

pub fn light_theme() -> Arc<dyn ThemePolicy> {
    Arc::new(FixedTheme(ColorScheme::Light))
}

pub fn pane(text: &str) -> EditorPane {
    EditorPane::new(TextDocument::new(text), light_theme())
}

/// Writes documents into a temporary directory
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}
