//! The static search page served at `/`.

const MOUNT_PLACEHOLDER: &str = "{{MOUNT_PATH}}";

const INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Search Session Proxy</title>
    <style>
        body {
            background: linear-gradient(to right, red, yellow, green, blue, pink);
            color: black;
            font-family: Arial, sans-serif;
            text-align: center;
            margin: 0;
            padding: 20px;
        }
        h1 {
            color: white;
        }
        input[type="text"] {
            width: 80%;
            padding: 10px;
            margin-top: 10px;
            border: 2px solid black;
        }
        button {
            padding: 10px 20px;
            margin-top: 10px;
            background-color: white;
            border: 1px solid black;
            cursor: pointer;
        }
        button:hover {
            background-color: gray;
        }
    </style>
</head>
<body>
    <h1>Search Session Proxy</h1>
    <input type="text" id="inputField" placeholder="Search or enter a URL" />
    <br />
    <button id="searchButton">Search</button>
    <script>
        document.getElementById('searchButton').onclick = function() {
            const input = document.getElementById('inputField').value;
            if (input.startsWith('http://') || input.startsWith('https://')) {
                window.open(input, '_self');
            } else {
                window.open('{{MOUNT_PATH}}?q=' + encodeURIComponent(input), '_blank');
            }
        };
    </script>
</body>
</html>
"#;

/// Render the page with its search form pointed at `mount_path`.
pub fn render_index(mount_path: &str) -> String {
    INDEX_TEMPLATE.replace(MOUNT_PLACEHOLDER, mount_path)
}
