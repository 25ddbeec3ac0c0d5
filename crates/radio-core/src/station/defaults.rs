//! Built-in station table, loaded on first boot and on an explicit reload.

/// Default `(tag, url)` presets, one per slot.
pub const DEFAULT_STATIONS: [(&str, &str); super::STATION_SLOTS] = [
    ("Psyndora Chillout", "http://cast.magicstreams.gr:9125"),
    ("Psyndora Psytrance", "http://cast.magicstreams.gr:9111"),
    ("Radio Play Emotions", "http://5.39.82.157:8054/stream"),
    ("Rare 80s Music", "http://209.9.238.4:9844/"),
    ("Simply Oldies", "http://uk5.internet-radio.com:8153"),
    ("Spirit Country Radio", "http://us2.internet-radio.com:8035"),
    ("Synphaera Radio", "http://ice2.somafm.com/synphaera-128-mp3"),
    ("The Seagull", "http://us5.internet-radio.com:8121"),
    ("The Zone", "http://uk1.internet-radio.com:8355"),
    ("XRDS.fm", "http://us1.internet-radio.com:8321"),
    ("Ambient Radio", "http://uk2.internet-radio.com:8171/stream"),
    ("Best of Art Bell", "http://108.161.128.117:8050"),
    ("Big 80s Station", "http://158.69.114.190:8024"),
    ("Big Hair Radio", "http://192.111.140.11:8508"),
    ("Classical Radio", "http://philae.shoutca.st:8204"),
    ("Dark Edge Radio", "http://5.35.214.196:8000"),
    ("Detroit Industrial Underground", "http://138.197.0.4:8000/stream"),
    ("Dimensione Relax", "http://51.161.115.200:8012/stream"),
    ("Disco Funk", "http://eu10.fastcast4u.com:8120"),
    ("EarthSong Experimental", "http://cast3.my-control-panel.com:7084/autodj"),
    ("Ethereal Radio", "http://us4.internet-radio.com:8073/live"),
    ("First Amendment Radio", "http://198.178.123.8:7862"),
    ("Gothville", "http://gothville.radio:8000/stream"),
    ("Hanks Old Time Radio", "http://46.105.125.110:9714"),
    ("HardTecho and Schranz", "http://schranz.in:8000"),
    ("Hit List Radio", "http://us1.internet-radio.com:8118"),
    ("J-Pop Sakura", "http://cast1.torontocast.com:2170"),
    ("Lounge Radio", "http://fr1.streamhosting.ch:80/lounge128.mp3"),
    ("Mangled Web Radio", "http://144.126.151.19:8000/mp3"),
    ("Megaton Cafe Radio", "http://us2.internet-radio.com:8443"),
    ("Metal Express Radio", "http://5.135.154.69:11590"),
    ("Metal Rock Radio", "http://kathy.torontocast.com:2800"),
    ("Mission Control Radio", "http://151.80.42.191:8372"),
    ("Moon Mission Recordings", "http://uk5.internet-radio.com:8306"),
    ("Move Da House", "http://uk7.internet-radio.com:8000"),
    ("Mr. Liberty Show", "http://198.178.123.5:8258"),
];
